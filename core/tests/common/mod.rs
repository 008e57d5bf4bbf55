// tests/common/mod.rs
#![allow(dead_code)] // Allow unused helpers in this common test module

use async_trait::async_trait;
use postflight::{
  Aggregatable, BranchAggregator, BranchRun, BuildContext, BuildStep, DeclaredDependency,
  DeclaresDependencies, DependencyCollector, RunCondition, SharedContext,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::Level;

// --- Shared journal recording execution order across steps and units ---

pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn new_journal() -> Journal {
  Arc::new(Mutex::new(Vec::new()))
}

pub fn journal_entries(journal: &Journal) -> Vec<String> {
  journal.lock().unwrap().clone()
}

// --- Test steps ---

#[derive(Clone)]
pub enum StepOutcome {
  Succeed,
  Fail,
  Error(&'static str),
  Panic(&'static str),
}

/// Step that records its invocations and returns a configured outcome.
pub struct RecordingStep {
  name: String,
  outcome: StepOutcome,
  prebuild_ok: bool,
  prebuilt: AtomicUsize,
  performed: AtomicUsize,
  journal: Option<Journal>,
}

impl RecordingStep {
  pub fn succeeding(name: &str) -> Self {
    Self::with_outcome(name, StepOutcome::Succeed)
  }

  pub fn failing(name: &str) -> Self {
    Self::with_outcome(name, StepOutcome::Fail)
  }

  pub fn erroring(name: &str, message: &'static str) -> Self {
    Self::with_outcome(name, StepOutcome::Error(message))
  }

  pub fn panicking(name: &str, message: &'static str) -> Self {
    Self::with_outcome(name, StepOutcome::Panic(message))
  }

  pub fn with_outcome(name: &str, outcome: StepOutcome) -> Self {
    Self {
      name: name.to_string(),
      outcome,
      prebuild_ok: true,
      prebuilt: AtomicUsize::new(0),
      performed: AtomicUsize::new(0),
      journal: None,
    }
  }

  pub fn with_journal(mut self, journal: &Journal) -> Self {
    self.journal = Some(journal.clone());
    self
  }

  pub fn with_prebuild_failure(mut self) -> Self {
    self.prebuild_ok = false;
    self
  }

  pub fn times_prebuilt(&self) -> usize {
    self.prebuilt.load(Ordering::SeqCst)
  }

  pub fn times_performed(&self) -> usize {
    self.performed.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl BuildStep for RecordingStep {
  fn display_name(&self) -> &str {
    &self.name
  }

  fn prebuild(&self, _ctx: &SharedContext) -> bool {
    self.prebuilt.fetch_add(1, Ordering::SeqCst);
    self.prebuild_ok
  }

  async fn perform(&self, _ctx: SharedContext) -> anyhow::Result<bool> {
    self.performed.fetch_add(1, Ordering::SeqCst);
    if let Some(journal) = &self.journal {
      journal.lock().unwrap().push(self.name.clone());
    }
    match &self.outcome {
      StepOutcome::Succeed => Ok(true),
      StepOutcome::Fail => Ok(false),
      StepOutcome::Error(message) => Err(anyhow::anyhow!("{}", message)),
      StepOutcome::Panic(message) => panic!("{}", message),
    }
  }
}

// --- Test conditions ---

/// Fixed-value condition counting its evaluations.
pub struct FlagCondition {
  name: String,
  value: bool,
  evaluations: AtomicUsize,
}

impl FlagCondition {
  pub fn new(name: &str, value: bool) -> Self {
    Self {
      name: name.to_string(),
      value,
      evaluations: AtomicUsize::new(0),
    }
  }

  pub fn times_evaluated(&self) -> usize {
    self.evaluations.load(Ordering::SeqCst)
  }
}

impl RunCondition for FlagCondition {
  fn display_name(&self) -> &str {
    &self.name
  }

  fn evaluate(&self, _ctx: &SharedContext) -> anyhow::Result<bool> {
    self.evaluations.fetch_add(1, Ordering::SeqCst);
    Ok(self.value)
  }
}

/// Condition whose evaluation always fails.
pub struct ErroringCondition;

impl RunCondition for ErroringCondition {
  fn display_name(&self) -> &str {
    "Erroring"
  }

  fn evaluate(&self, _ctx: &SharedContext) -> anyhow::Result<bool> {
    Err(anyhow::anyhow!("condition exploded"))
  }
}

/// Condition whose evaluation panics, for the defensive orchestrator catch.
pub struct PanickingCondition;

impl RunCondition for PanickingCondition {
  fn display_name(&self) -> &str {
    "Panicking"
  }

  fn evaluate(&self, _ctx: &SharedContext) -> anyhow::Result<bool> {
    panic!("condition panicked");
  }
}

// --- Test aggregators ---

#[derive(Clone)]
pub enum HookOutcome {
  Succeed,
  Fail,
  Error(&'static str),
}

fn hook_result(outcome: &HookOutcome) -> anyhow::Result<bool> {
  match outcome {
    HookOutcome::Succeed => Ok(true),
    HookOutcome::Fail => Ok(false),
    HookOutcome::Error(message) => Err(anyhow::anyhow!("{}", message)),
  }
}

/// Aggregator counting its hook invocations and returning configured
/// outcomes. Shared between the test body and the step that contributes it.
pub struct CountingAggregator {
  name: String,
  start: HookOutcome,
  per_branch: HookOutcome,
  end: HookOutcome,
  starts: AtomicUsize,
  branches: Mutex<Vec<String>>,
  ends: AtomicUsize,
}

impl CountingAggregator {
  pub fn succeeding(name: &str) -> Arc<Self> {
    Arc::new(Self::new(
      name,
      HookOutcome::Succeed,
      HookOutcome::Succeed,
      HookOutcome::Succeed,
    ))
  }

  pub fn new(name: &str, start: HookOutcome, per_branch: HookOutcome, end: HookOutcome) -> Self {
    Self {
      name: name.to_string(),
      start,
      per_branch,
      end,
      starts: AtomicUsize::new(0),
      branches: Mutex::new(Vec::new()),
      ends: AtomicUsize::new(0),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn times_started(&self) -> usize {
    self.starts.load(Ordering::SeqCst)
  }

  pub fn branches_seen(&self) -> Vec<String> {
    self.branches.lock().unwrap().clone()
  }

  pub fn times_ended(&self) -> usize {
    self.ends.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl BranchAggregator for CountingAggregator {
  fn display_name(&self) -> &str {
    &self.name
  }

  async fn start_build(&self) -> anyhow::Result<bool> {
    self.starts.fetch_add(1, Ordering::SeqCst);
    hook_result(&self.start)
  }

  async fn end_branch(&self, branch: &BranchRun) -> anyhow::Result<bool> {
    self.branches.lock().unwrap().push(branch.id.clone());
    hook_result(&self.per_branch)
  }

  async fn end_build(&self) -> anyhow::Result<bool> {
    self.ends.fetch_add(1, Ordering::SeqCst);
    hook_result(&self.end)
  }
}

/// Delegating wrapper so a test-held `Arc<CountingAggregator>` can be handed
/// to the coordinator as a boxed aggregator.
pub struct SharedAggregator(pub Arc<CountingAggregator>);

#[async_trait]
impl BranchAggregator for SharedAggregator {
  fn display_name(&self) -> &str {
    self.0.display_name()
  }

  async fn start_build(&self) -> anyhow::Result<bool> {
    self.0.start_build().await
  }

  async fn end_branch(&self, branch: &BranchRun) -> anyhow::Result<bool> {
    self.0.end_branch(branch).await
  }

  async fn end_build(&self) -> anyhow::Result<bool> {
    self.0.end_build().await
  }
}

/// Step exposing the aggregation capability, yielding the shared counting
/// aggregator.
pub struct AggregatingStep {
  step: RecordingStep,
  aggregator: Arc<CountingAggregator>,
}

impl AggregatingStep {
  pub fn new(name: &str, aggregator: Arc<CountingAggregator>) -> Self {
    Self {
      step: RecordingStep::succeeding(name),
      aggregator,
    }
  }
}

#[async_trait]
impl BuildStep for AggregatingStep {
  fn display_name(&self) -> &str {
    self.step.display_name()
  }

  async fn perform(&self, ctx: SharedContext) -> anyhow::Result<bool> {
    self.step.perform(ctx).await
  }

  fn aggregatable(&self) -> Option<&dyn Aggregatable> {
    Some(self)
  }
}

impl Aggregatable for AggregatingStep {
  fn create_aggregator(&self, _parent: SharedContext) -> Option<Box<dyn BranchAggregator>> {
    Some(Box::new(SharedAggregator(self.aggregator.clone())))
  }
}

// --- Dependency helpers ---

/// Collector storing everything handed to it.
#[derive(Default)]
pub struct VecCollector {
  pub dependencies: Vec<DeclaredDependency>,
}

impl DependencyCollector for VecCollector {
  fn add(&mut self, dependency: DeclaredDependency) {
    self.dependencies.push(dependency);
  }
}

/// Step declaring one downstream dependency.
pub struct DependentStep {
  step: RecordingStep,
  downstream: String,
}

impl DependentStep {
  pub fn new(name: &str, downstream: &str) -> Self {
    Self {
      step: RecordingStep::succeeding(name),
      downstream: downstream.to_string(),
    }
  }
}

#[async_trait]
impl BuildStep for DependentStep {
  fn display_name(&self) -> &str {
    self.step.display_name()
  }

  async fn perform(&self, ctx: SharedContext) -> anyhow::Result<bool> {
    self.step.perform(ctx).await
  }

  fn dependency_declarer(&self) -> Option<&dyn DeclaresDependencies> {
    Some(self)
  }
}

impl DeclaresDependencies for DependentStep {
  fn declare_dependencies(&self, collector: &mut dyn DependencyCollector) {
    collector.add(DeclaredDependency {
      upstream: self.step.display_name().to_string(),
      downstream: self.downstream.clone(),
      guard: None,
    });
  }
}

// --- Context and log helpers ---

pub fn new_context() -> SharedContext {
  SharedContext::new(BuildContext::new())
}

pub fn log_errors(ctx: &SharedContext) -> Vec<String> {
  ctx.read().log().errors().map(str::to_string).collect()
}

// --- Helper for tracing setup (call once per test run if needed) ---

use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
