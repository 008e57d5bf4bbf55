// postflight/src/strategy/fail_fast.rs

//! Stop running steps immediately when one of them fails. The following
//! steps are not performed.

use async_trait::async_trait;

use super::group::FailFastGroup;
use super::{
  record_aggregation_error, record_aggregation_failure, AggregationPhaseContext,
  ExecutionStrategy, StrategyContext,
};
use crate::core::context::SharedContext;
use crate::gate;

#[derive(Debug, Clone, Copy, Default)]
pub struct FailFast;

#[async_trait]
impl ExecutionStrategy for FailFast {
  fn display_name(&self) -> &'static str {
    "Fail fast"
  }

  fn prebuild(&self, scx: &StrategyContext<'_>, ctx: &SharedContext) -> bool {
    gate::prebuild(scx.condition, &FailFastGroup::new(scx.steps), ctx)
  }

  async fn perform(&self, scx: &StrategyContext<'_>, ctx: SharedContext) -> bool {
    gate::perform(scx.condition, &FailFastGroup::new(scx.steps), ctx).await
  }

  async fn aggregation_end_build(&self, acx: &AggregationPhaseContext<'_>) -> bool {
    for aggregator in acx.aggregators {
      match aggregator.end_build().await {
        Ok(true) => {}
        Ok(false) => {
          record_aggregation_failure(acx.parent, aggregator.display_name());
          return false;
        }
        Err(err) => {
          record_aggregation_error(acx.parent, aggregator.display_name(), &err);
          return false;
        }
      }
    }
    true
  }
}
