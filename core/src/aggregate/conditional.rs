// postflight/src/aggregate/conditional.rs

//! Per-unit aggregation: wraps the base aggregators contributed by one
//! unit's steps and dispatches every phase through that unit's configured
//! aggregation condition and strategy.

use std::sync::Arc;
use tracing::{event, Level};

use super::{BranchAggregator, BranchRun};
use crate::core::condition::RunCondition;
use crate::core::context::SharedContext;
use crate::strategy::{AggregationPhaseContext, ExecutionStrategy};

pub struct ConditionalAggregator {
  parent: SharedContext,
  condition: Arc<dyn RunCondition>,
  strategy: Arc<dyn ExecutionStrategy>,
  aggregators: Vec<Box<dyn BranchAggregator>>,
  label: String,
}

impl ConditionalAggregator {
  pub(crate) fn new(
    parent: SharedContext,
    condition: Arc<dyn RunCondition>,
    strategy: Arc<dyn ExecutionStrategy>,
    aggregators: Vec<Box<dyn BranchAggregator>>,
    label: String,
  ) -> Self {
    Self {
      parent,
      condition,
      strategy,
      aggregators,
      label,
    }
  }

  /// Display name of the owning unit.
  pub fn label(&self) -> &str {
    &self.label
  }

  pub async fn start_build(&self) -> bool {
    self.strategy.aggregation_start(&self.phase_context()).await
  }

  pub async fn end_branch(&self, branch: &BranchRun) -> bool {
    event!(
      Level::DEBUG,
      unit = self.label.as_str(),
      branch = branch.id.as_str(),
      "aggregating finished branch"
    );
    self
      .strategy
      .aggregation_end_branch(&self.phase_context(), branch)
      .await
  }

  pub async fn end_build(&self) -> bool {
    self.strategy.aggregation_end_build(&self.phase_context()).await
  }

  fn phase_context(&self) -> AggregationPhaseContext<'_> {
    AggregationPhaseContext {
      parent: &self.parent,
      condition: self.condition.as_ref(),
      aggregators: &self.aggregators,
      label: &self.label,
    }
  }
}
