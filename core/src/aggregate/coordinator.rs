// postflight/src/aggregate/coordinator.rs

//! Drives the three-phase aggregation protocol across every eligible
//! unit's aggregator, in unit order.

use tracing::{event, instrument, Level};

use super::{BranchRun, ConditionalAggregator};

/// One matrix build's aggregation driver. Built by
/// [`Orchestrator::create_aggregation`](crate::orchestrator::Orchestrator::create_aggregation),
/// which returns no coordinator at all when no unit is eligible.
pub struct AggregationCoordinator {
  aggregators: Vec<ConditionalAggregator>,
}

impl AggregationCoordinator {
  pub(crate) fn new(aggregators: Vec<ConditionalAggregator>) -> Self {
    Self { aggregators }
  }

  /// Number of units contributing to this matrix build's aggregation.
  pub fn unit_count(&self) -> usize {
    self.aggregators.len()
  }

  /// Called when the parent build starts. Returns false to abort the
  /// build; later phases assume every aggregator started successfully.
  #[instrument(name = "AggregationCoordinator::start_build", skip_all, fields(units = self.aggregators.len()))]
  pub async fn start_build(&self) -> bool {
    for aggregator in &self.aggregators {
      if !aggregator.start_build().await {
        event!(
          Level::WARN,
          unit = aggregator.label(),
          "aggregation start failed, aborting phase"
        );
        return false;
      }
    }
    true
  }

  /// Called once per completed branch, with that branch's own context.
  #[instrument(name = "AggregationCoordinator::end_branch", skip_all, fields(branch = %branch.id))]
  pub async fn end_branch(&self, branch: &BranchRun) -> bool {
    for aggregator in &self.aggregators {
      if !aggregator.end_branch(branch).await {
        return false;
      }
    }
    true
  }

  /// Called once after all branches complete.
  #[instrument(name = "AggregationCoordinator::end_build", skip_all, fields(units = self.aggregators.len()))]
  pub async fn end_build(&self) -> bool {
    for aggregator in &self.aggregators {
      if !aggregator.end_build().await {
        return false;
      }
    }
    true
  }
}
