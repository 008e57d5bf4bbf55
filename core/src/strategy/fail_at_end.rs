// postflight/src/strategy/fail_at_end.rs

//! Run all steps even when some of them fail, the way the host runtime
//! drives its own post-processing:
//!
//! | phase                  | behavior    |
//! |------------------------|-------------|
//! | prebuild               | fail fast   |
//! | perform                | fail at end |
//! | aggregation start      | fail fast   |
//! | aggregation end-branch | fail fast   |
//! | aggregation end-build  | fail at end |

use async_trait::async_trait;

use super::group::FailAtEndGroup;
use super::{
  record_aggregation_error, record_aggregation_failure, AggregationPhaseContext,
  ExecutionStrategy, StrategyContext,
};
use crate::core::context::SharedContext;
use crate::gate;

/// The default strategy for newly configured units.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailAtEnd;

#[async_trait]
impl ExecutionStrategy for FailAtEnd {
  fn display_name(&self) -> &'static str {
    "Fail at the end"
  }

  fn prebuild(&self, scx: &StrategyContext<'_>, ctx: &SharedContext) -> bool {
    gate::prebuild(scx.condition, &FailAtEndGroup::new(scx.steps), ctx)
  }

  async fn perform(&self, scx: &StrategyContext<'_>, ctx: SharedContext) -> bool {
    gate::perform(scx.condition, &FailAtEndGroup::new(scx.steps), ctx).await
  }

  async fn aggregation_end_build(&self, acx: &AggregationPhaseContext<'_>) -> bool {
    let mut whole_result = true;
    for aggregator in acx.aggregators {
      match aggregator.end_build().await {
        Ok(true) => {}
        Ok(false) => {
          record_aggregation_failure(acx.parent, aggregator.display_name());
          whole_result = false;
        }
        Err(err) => {
          record_aggregation_error(acx.parent, aggregator.display_name(), &err);
          whole_result = false;
        }
      }
    }
    whole_result
  }
}
