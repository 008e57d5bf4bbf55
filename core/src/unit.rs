// postflight/src/unit.rs

//! `ConditionalUnit`: one configured (condition, steps, strategy) tuple,
//! optionally carrying a separate condition/strategy pair for matrix
//! aggregation.

use std::sync::Arc;
use tracing::{event, Level};

use crate::aggregate::{BranchAggregator, ConditionalAggregator};
use crate::core::condition::RunCondition;
use crate::core::context::SharedContext;
use crate::core::step::{
  step_list_name, BuildStep, DeclaredDependency,
  DependencyCollector,
};
use crate::strategy::{ExecutionStrategy, StrategyContext};

/// Aggregation-specific condition and strategy. Either both are configured
/// or neither: a unit without an override aggregates under its main
/// condition and strategy, and there is no partial fallback.
#[derive(Clone, Debug)]
pub struct AggregationOverride {
  pub condition: Arc<dyn RunCondition>,
  pub strategy: Arc<dyn ExecutionStrategy>,
}

/// The atomic configured unit: a condition gating an ordered step list, run
/// under a failure-handling strategy. Immutable after construction.
#[derive(Debug)]
pub struct ConditionalUnit {
  condition: Arc<dyn RunCondition>,
  steps: Vec<Arc<dyn BuildStep>>,
  strategy: Arc<dyn ExecutionStrategy>,
  aggregation: Option<AggregationOverride>,
}

impl ConditionalUnit {
  pub fn new(
    condition: Arc<dyn RunCondition>,
    steps: Vec<Arc<dyn BuildStep>>,
    strategy: Arc<dyn ExecutionStrategy>,
  ) -> Self {
    Self {
      condition,
      steps,
      strategy,
      aggregation: None,
    }
  }

  /// Configures a separate condition/strategy pair for aggregation.
  pub fn with_aggregation(
    mut self,
    condition: Arc<dyn RunCondition>,
    strategy: Arc<dyn ExecutionStrategy>,
  ) -> Self {
    self.aggregation = Some(AggregationOverride { condition, strategy });
    self
  }

  pub fn condition(&self) -> &Arc<dyn RunCondition> {
    &self.condition
  }

  pub fn steps(&self) -> &[Arc<dyn BuildStep>] {
    &self.steps
  }

  pub fn strategy(&self) -> &Arc<dyn ExecutionStrategy> {
    &self.strategy
  }

  pub fn aggregation(&self) -> Option<&AggregationOverride> {
    self.aggregation.as_ref()
  }

  /// Short name of the unit's step list, used to attribute failures.
  pub fn display_name(&self) -> String {
    step_list_name(&self.steps)
  }

  /// Pre-check phase. A false return affects diagnostics only; the
  /// orchestrator records it without aborting the phase.
  pub fn prebuild(&self, ctx: &SharedContext) -> bool {
    self.strategy.prebuild(&self.strategy_context(), ctx)
  }

  /// Perform phase. Every fallible path is closed below this boundary: the
  /// gate handles condition errors and the step groups handle step errors
  /// and panics, so the unit's outcome is a plain boolean.
  pub async fn perform(&self, ctx: SharedContext) -> bool {
    self.strategy.perform(&self.strategy_context(), ctx).await
  }

  /// Builds this unit's per-matrix-build aggregator, if any of its steps
  /// supports aggregation. Units with no aggregatable step contribute
  /// nothing here and still run per-branch through the ordinary perform
  /// path.
  pub fn create_aggregation(&self, parent: &SharedContext) -> Option<ConditionalAggregator> {
    let aggregators: Vec<Box<dyn BranchAggregator>> = self
      .steps
      .iter()
      .filter_map(|step| {
        step
          .aggregatable()
          .and_then(|a| a.create_aggregator(parent.clone()))
      })
      .collect();

    if aggregators.is_empty() {
      return None;
    }

    event!(
      Level::DEBUG,
      unit = %self.display_name(),
      aggregators = aggregators.len(),
      "unit contributes to matrix aggregation"
    );
    Some(ConditionalAggregator::new(
      parent.clone(),
      Arc::clone(self.aggregation_condition()),
      Arc::clone(self.aggregation_strategy()),
      aggregators,
      self.display_name(),
    ))
  }

  /// Calls through to each step's dependency hook, guarding every declared
  /// dependency with this unit's condition.
  pub fn declare_dependencies(&self, collector: &mut dyn DependencyCollector) {
    let mut guarded = GuardedCollector {
      inner: collector,
      guard: &self.condition,
    };
    for step in &self.steps {
      if let Some(declarer) = step.dependency_declarer() {
        declarer.declare_dependencies(&mut guarded);
      }
    }
  }

  fn aggregation_condition(&self) -> &Arc<dyn RunCondition> {
    match &self.aggregation {
      Some(o) => &o.condition,
      None => &self.condition,
    }
  }

  fn aggregation_strategy(&self) -> &Arc<dyn ExecutionStrategy> {
    match &self.aggregation {
      Some(o) => &o.strategy,
      None => &self.strategy,
    }
  }

  fn strategy_context(&self) -> StrategyContext<'_> {
    StrategyContext {
      condition: self.condition.as_ref(),
      steps: &self.steps,
    }
  }
}

/// Wraps a host collector so declared dependencies carry the owning unit's
/// condition; the host evaluates it before triggering downstream builds.
struct GuardedCollector<'a> {
  inner: &'a mut dyn DependencyCollector,
  guard: &'a Arc<dyn RunCondition>,
}

impl DependencyCollector for GuardedCollector<'_> {
  fn add(&mut self, mut dependency: DeclaredDependency) {
    dependency.guard = Some(Arc::clone(self.guard));
    self.inner.add(dependency);
  }
}
