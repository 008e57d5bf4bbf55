// postflight/examples/basic_orchestration.rs

use async_trait::async_trait;
use postflight::{
  AlwaysRun, BuildContext, BuildStep, ConditionalUnit, FailAtEnd, NeverRun, Orchestrator,
  SharedContext, StatusCondition, Severity,
};
use std::sync::Arc;
use tracing::info;

// --- Steps ---

/// Pretends to archive the build's artifacts.
struct ArchiveArtifacts;

#[async_trait]
impl BuildStep for ArchiveArtifacts {
  fn display_name(&self) -> &str {
    "Archive artifacts"
  }

  async fn perform(&self, ctx: SharedContext) -> anyhow::Result<bool> {
    ctx.write().log_mut().info("archived 3 artifacts");
    info!("archive: done");
    Ok(true)
  }
}

/// Pretends to notify a chat channel, and fails.
struct NotifyChat;

#[async_trait]
impl BuildStep for NotifyChat {
  fn display_name(&self) -> &str {
    "Notify chat"
  }

  async fn perform(&self, _ctx: SharedContext) -> anyhow::Result<bool> {
    info!("notify: webhook rejected the payload");
    Ok(false)
  }
}

/// A cleanup step that should run no matter what happened before it.
struct CleanWorkspace;

#[async_trait]
impl BuildStep for CleanWorkspace {
  fn display_name(&self) -> &str {
    "Clean workspace"
  }

  async fn perform(&self, ctx: SharedContext) -> anyhow::Result<bool> {
    ctx.write().log_mut().info("workspace cleaned");
    info!("clean: done");
    Ok(true)
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Basic Orchestration Example ---");

  let orchestrator = Orchestrator::new(vec![
    // Runs while the build is still healthy; the failing notification does
    // not stop the cleanup step because the unit runs fail-at-end.
    ConditionalUnit::new(
      Arc::new(StatusCondition::new(Severity::Unstable)),
      vec![
        Arc::new(ArchiveArtifacts),
        Arc::new(NotifyChat),
        Arc::new(CleanWorkspace),
      ],
      Arc::new(FailAtEnd),
    ),
    // Gated off entirely: its step never runs.
    ConditionalUnit::new(
      Arc::new(NeverRun),
      vec![Arc::new(NotifyChat)],
      Arc::new(FailAtEnd),
    ),
    // A healthy unit after the failing one still runs.
    ConditionalUnit::new(
      Arc::new(AlwaysRun),
      vec![Arc::new(ArchiveArtifacts)],
      Arc::new(FailAtEnd),
    ),
  ]);

  let ctx = SharedContext::new(BuildContext::new());
  orchestrator.prebuild(&ctx);
  let ok = orchestrator.perform(ctx.clone()).await;

  let guard = ctx.read();
  info!("overall success: {}, build result: {}", ok, guard.result());
  for entry in guard.log().entries() {
    info!("console | {:?}: {}", entry.level, entry.message);
  }

  assert!(!ok, "the failing notification makes the conjunction false");
  assert_eq!(guard.result(), Severity::Failure);
}
