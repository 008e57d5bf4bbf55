// postflight/examples/failure_strategies.rs

use async_trait::async_trait;
use postflight::{
  AlwaysRun, BuildContext, BuildStep, ConditionalUnit, ExecutionStrategy, FailAtEnd, FailFast,
  Orchestrator, SharedContext,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

struct CountedStep {
  name: &'static str,
  succeeds: bool,
  runs: Arc<AtomicUsize>,
}

#[async_trait]
impl BuildStep for CountedStep {
  fn display_name(&self) -> &str {
    self.name
  }

  async fn perform(&self, _ctx: SharedContext) -> anyhow::Result<bool> {
    self.runs.fetch_add(1, Ordering::SeqCst);
    info!("{}: {}", self.name, if self.succeeds { "ok" } else { "failed" });
    Ok(self.succeeds)
  }
}

async fn run_with(strategy: Arc<dyn ExecutionStrategy>) -> (bool, usize) {
  let later_runs = Arc::new(AtomicUsize::new(0));
  let orchestrator = Orchestrator::new(vec![ConditionalUnit::new(
    Arc::new(AlwaysRun),
    vec![
      Arc::new(CountedStep {
        name: "deploy",
        succeeds: false,
        runs: Arc::new(AtomicUsize::new(0)),
      }),
      Arc::new(CountedStep {
        name: "archive",
        succeeds: true,
        runs: later_runs.clone(),
      }),
    ],
    strategy,
  )]);

  let ctx = SharedContext::new(BuildContext::new());
  let ok = orchestrator.perform(ctx).await;
  (ok, later_runs.load(Ordering::SeqCst))
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Failure Strategy Comparison ---");

  info!("fail fast: the failing deploy short-circuits the archive step");
  let (ok, archive_runs) = run_with(Arc::new(FailFast)).await;
  assert!(!ok);
  assert_eq!(archive_runs, 0);

  info!("fail at end: the archive step still runs after the failing deploy");
  let (ok, archive_runs) = run_with(Arc::new(FailAtEnd)).await;
  assert!(!ok);
  assert_eq!(archive_runs, 1);

  info!("both strategies report the failure; they differ only in what else still runs");
}
