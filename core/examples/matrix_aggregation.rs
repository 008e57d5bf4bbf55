// postflight/examples/matrix_aggregation.rs

use async_trait::async_trait;
use postflight::{
  Aggregatable, AlwaysRun, BranchAggregator, BranchRun, BuildContext, BuildStep, ConditionalUnit,
  FailAtEnd, Orchestrator, SharedContext, StatusCondition, Severity,
};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Collects per-branch test counts into a parent-level summary.
struct TestReportCollector {
  branch_totals: Mutex<Vec<(String, u32)>>,
}

#[async_trait]
impl BranchAggregator for TestReportCollector {
  fn display_name(&self) -> &str {
    "Test report collector"
  }

  async fn end_branch(&self, branch: &BranchRun) -> anyhow::Result<bool> {
    // A real collector would read the branch's report files here.
    let tests_in_branch = 42;
    self
      .branch_totals
      .lock()
      .unwrap()
      .push((branch.id.clone(), tests_in_branch));
    info!("collected {} test results from {}", tests_in_branch, branch.id);
    Ok(true)
  }

  async fn end_build(&self) -> anyhow::Result<bool> {
    let totals = self.branch_totals.lock().unwrap();
    let sum: u32 = totals.iter().map(|(_, n)| n).sum();
    info!("parent-level summary: {} tests across {} branches", sum, totals.len());
    Ok(true)
  }
}

/// The step that publishes test results and supports aggregation.
struct PublishTestResults {
  collector: Arc<TestReportCollector>,
}

#[async_trait]
impl BuildStep for PublishTestResults {
  fn display_name(&self) -> &str {
    "Publish test results"
  }

  async fn perform(&self, _ctx: SharedContext) -> anyhow::Result<bool> {
    info!("published this branch's test results");
    Ok(true)
  }

  fn aggregatable(&self) -> Option<&dyn Aggregatable> {
    Some(self)
  }
}

struct CollectorHandle(Arc<TestReportCollector>);

#[async_trait]
impl BranchAggregator for CollectorHandle {
  fn display_name(&self) -> &str {
    self.0.display_name()
  }

  async fn end_branch(&self, branch: &BranchRun) -> anyhow::Result<bool> {
    self.0.end_branch(branch).await
  }

  async fn end_build(&self) -> anyhow::Result<bool> {
    self.0.end_build().await
  }
}

impl Aggregatable for PublishTestResults {
  fn create_aggregator(&self, _parent: SharedContext) -> Option<Box<dyn BranchAggregator>> {
    Some(Box::new(CollectorHandle(self.collector.clone())))
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Matrix Aggregation Example ---");

  let collector = Arc::new(TestReportCollector {
    branch_totals: Mutex::new(Vec::new()),
  });

  let orchestrator = Orchestrator::new(vec![ConditionalUnit::new(
    Arc::new(AlwaysRun),
    vec![Arc::new(PublishTestResults {
      collector: collector.clone(),
    })],
    Arc::new(FailAtEnd),
  )
  // Aggregate only while the parent build looks healthy for the branch.
  .with_aggregation(
    Arc::new(StatusCondition::new(Severity::Unstable)),
    Arc::new(FailAtEnd),
  )]);

  // The host drives the lifecycle: one coordinator per matrix build.
  let parent = SharedContext::new(BuildContext::new());
  let coordinator = orchestrator
    .create_aggregation(&parent)
    .expect("the publishing unit supports aggregation");

  assert!(coordinator.start_build().await);

  // Each axis combination runs as its own build with its own context; the
  // host reports each completed branch back to the coordinator.
  for axis in ["linux", "macos", "windows"] {
    let branch_ctx = SharedContext::new(BuildContext::new());
    if axis == "windows" {
      // This branch failed; the aggregation condition skips it.
      branch_ctx.write().set_result(Severity::Failure);
    }
    let branch = BranchRun::new(format!("os={}", axis), branch_ctx.clone());
    orchestrator.perform(branch_ctx).await;
    assert!(coordinator.end_branch(&branch).await);
  }

  assert!(coordinator.end_build().await);

  let totals = collector.branch_totals.lock().unwrap();
  assert_eq!(totals.len(), 2, "the failed windows branch was skipped");
  info!("aggregated branches: {:?}", *totals);
}
