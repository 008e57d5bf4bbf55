// postflight/src/strategy/mod.rs

//! Execution strategies: the pluggable failure-handling policy applied to a
//! unit's step group in the perform phases and to its aggregators in the
//! three matrix aggregation phases.

pub mod fail_at_end;
pub mod fail_fast;
pub mod group;

pub use fail_at_end::FailAtEnd;
pub use fail_fast::FailFast;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, Level};

use crate::aggregate::{BranchAggregator, BranchRun};
use crate::core::condition::RunCondition;
use crate::core::context::SharedContext;
use crate::core::severity::Severity;
use crate::core::step::BuildStep;
use crate::gate;
use crate::strategy::group::MarkPerformed;

/// Parameters for running a unit's steps. Carried as one object so new
/// parameters don't ripple through every strategy signature.
pub struct StrategyContext<'a> {
  pub condition: &'a dyn RunCondition,
  pub steps: &'a [Arc<dyn BuildStep>],
}

/// Parameters for driving one unit's branch aggregators.
pub struct AggregationPhaseContext<'a> {
  /// The parent (matrix) build's context. Aggregate-level failures log and
  /// worsen here, not in any single branch.
  pub parent: &'a SharedContext,
  pub condition: &'a dyn RunCondition,
  pub aggregators: &'a [Box<dyn BranchAggregator>],
  /// Display name of the owning unit, used to attribute failures.
  pub label: &'a str,
}

/// How to run the steps of one conditional unit in the face of failures.
///
/// The start and per-branch aggregation phases are shared across
/// strategies: starting is always fail-fast (later phases assume every
/// aggregator started), and a partially aggregated branch is not tolerated
/// under either policy. Only the end-build phase differs.
impl std::fmt::Debug for dyn ExecutionStrategy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExecutionStrategy").field("display_name", &self.display_name()).finish()
  }
}

#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
  fn display_name(&self) -> &'static str;

  /// Pre-check phase; always fail-fast regardless of the strategy.
  fn prebuild(&self, scx: &StrategyContext<'_>, ctx: &SharedContext) -> bool;

  /// Perform phase under this policy.
  async fn perform(&self, scx: &StrategyContext<'_>, ctx: SharedContext) -> bool;

  /// Parent-build-start hook fan-out. The first failure stops the phase.
  async fn aggregation_start(&self, acx: &AggregationPhaseContext<'_>) -> bool {
    for aggregator in acx.aggregators {
      match aggregator.start_build().await {
        Ok(true) => {}
        Ok(false) => return false,
        Err(err) => {
          event!(
            Level::ERROR,
            unit = acx.label,
            aggregator = aggregator.display_name(),
            error = %err,
            "aggregation start aborted due to error"
          );
          record_aggregation_error(acx.parent, aggregator.display_name(), &err);
          return false;
        }
      }
    }
    true
  }

  /// Per-completed-branch hook fan-out, gated by the unit's aggregation
  /// condition evaluated in the branch's own context. A branch the
  /// condition rejects is skipped, which is not a failure; a condition
  /// error is.
  async fn aggregation_end_branch(&self, acx: &AggregationPhaseContext<'_>, branch: &BranchRun) -> bool {
    let marker = MarkPerformed::new();
    let gate_ok = gate::perform(acx.condition, &marker, branch.context.clone()).await;
    if !gate_ok || !marker.performed() {
      return gate_ok;
    }

    for aggregator in acx.aggregators {
      match aggregator.end_branch(branch).await {
        Ok(true) => {}
        Ok(false) => return false,
        Err(err) => {
          event!(
            Level::ERROR,
            unit = acx.label,
            aggregator = aggregator.display_name(),
            branch = branch.id.as_str(),
            error = %err,
            "branch aggregation aborted due to error"
          );
          record_aggregation_error(acx.parent, aggregator.display_name(), &err);
          return false;
        }
      }
    }
    true
  }

  /// Parent-build-end hook fan-out; policy-specific.
  async fn aggregation_end_build(&self, acx: &AggregationPhaseContext<'_>) -> bool;
}

/// Closed policy selector used by persisted configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
  FailFast,
  /// The default for newly configured units.
  #[default]
  FailAtEnd,
}

impl StrategyKind {
  pub fn instantiate(self) -> Arc<dyn ExecutionStrategy> {
    match self {
      StrategyKind::FailFast => Arc::new(FailFast),
      StrategyKind::FailAtEnd => Arc::new(FailAtEnd),
    }
  }
}

pub(crate) fn record_aggregation_failure(parent: &SharedContext, aggregator: &str) {
  let mut guard = parent.write();
  guard
    .log_mut()
    .error(format!("[postflight] aggregation with {} failed", aggregator));
  guard.set_result(Severity::Failure);
}

pub(crate) fn record_aggregation_error(parent: &SharedContext, aggregator: &str, err: &anyhow::Error) {
  let mut guard = parent.write();
  guard.log_mut().error(format!(
    "[postflight] aggregation with {} aborted due to error: {:#}",
    aggregator, err
  ));
  guard.set_result(Severity::Failure);
}
