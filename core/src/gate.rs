// postflight/src/gate.rs

//! The condition gate: evaluates a `RunCondition` once per phase invocation
//! and runs the wrapped step group only if it is satisfied.
//!
//! Condition-not-met is not a failure — the gate reports success without
//! running the group. An error raised by the condition itself is a gate
//! failure, logged and never silently treated as `false`.

use tracing::{event, Level};

use crate::core::condition::RunCondition;
use crate::core::context::SharedContext;
use crate::core::severity::Severity;
use crate::strategy::group::StepGroup;

/// Gate for the pre-check phase. A condition error fails the gate; the
/// caller decides what a prebuild failure means for the build.
pub fn prebuild(condition: &dyn RunCondition, group: &dyn StepGroup, ctx: &SharedContext) -> bool {
  match condition.evaluate(ctx) {
    Ok(true) => group.prebuild(ctx),
    Ok(false) => {
      event!(
        Level::DEBUG,
        condition = condition.display_name(),
        "condition not met, skipping pre-check"
      );
      true
    }
    Err(err) => {
      event!(
        Level::ERROR,
        condition = condition.display_name(),
        error = %err,
        "condition evaluation failed during pre-check"
      );
      ctx.write().log_mut().error(format!(
        "[postflight] condition '{}' could not be evaluated: {:#}",
        condition.display_name(),
        err
      ));
      false
    }
  }
}

/// Gate for the perform phase. Also used with a
/// [`MarkPerformed`](crate::strategy::group::MarkPerformed) group by the
/// aggregation code to detect whether the gated action set would actually
/// run for a branch.
pub async fn perform(condition: &dyn RunCondition, group: &dyn StepGroup, ctx: SharedContext) -> bool {
  match condition.evaluate(&ctx) {
    Ok(true) => {
      event!(
        Level::DEBUG,
        condition = condition.display_name(),
        "condition met, running gated steps"
      );
      group.perform(ctx).await
    }
    Ok(false) => {
      event!(
        Level::DEBUG,
        condition = condition.display_name(),
        "condition not met, skipping"
      );
      true
    }
    Err(err) => {
      event!(
        Level::ERROR,
        condition = condition.display_name(),
        error = %err,
        "condition evaluation failed"
      );
      let mut guard = ctx.write();
      guard.log_mut().error(format!(
        "[postflight] condition '{}' could not be evaluated: {:#}",
        condition.display_name(),
        err
      ));
      guard.set_result(Severity::Failure);
      false
    }
  }
}
