// postflight/src/strategy/group.rs

//! Step groups: ordered execution of a unit's step list under a failure
//! policy. Step errors and panics are converted to attributed log entries
//! here and never propagate past this boundary.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{event, Level};

use crate::core::context::SharedContext;
use crate::core::severity::Severity;
use crate::core::step::BuildStep;

/// An ordered set of steps runnable as one gated action.
#[async_trait]
pub trait StepGroup: Send + Sync {
  /// Pre-check pass. Always fail-fast: prebuild establishes preconditions
  /// later steps rely on.
  fn prebuild(&self, ctx: &SharedContext) -> bool;

  /// Perform pass under this group's failure policy.
  async fn perform(&self, ctx: SharedContext) -> bool;
}

/// Stops at the first failing step; the remaining steps never run.
pub struct FailFastGroup<'a> {
  steps: &'a [Arc<dyn BuildStep>],
}

impl<'a> FailFastGroup<'a> {
  pub fn new(steps: &'a [Arc<dyn BuildStep>]) -> Self {
    Self { steps }
  }
}

#[async_trait]
impl StepGroup for FailFastGroup<'_> {
  fn prebuild(&self, ctx: &SharedContext) -> bool {
    run_prebuild(self.steps, ctx)
  }

  async fn perform(&self, ctx: SharedContext) -> bool {
    for step in self.steps {
      if !run_step(step.as_ref(), &ctx).await {
        return false;
      }
    }
    true
  }
}

/// Runs every step even when earlier ones fail; returns the conjunction of
/// the per-step outcomes.
pub struct FailAtEndGroup<'a> {
  steps: &'a [Arc<dyn BuildStep>],
}

impl<'a> FailAtEndGroup<'a> {
  pub fn new(steps: &'a [Arc<dyn BuildStep>]) -> Self {
    Self { steps }
  }
}

#[async_trait]
impl StepGroup for FailAtEndGroup<'_> {
  fn prebuild(&self, ctx: &SharedContext) -> bool {
    run_prebuild(self.steps, ctx)
  }

  async fn perform(&self, ctx: SharedContext) -> bool {
    let mut whole_result = true;
    for step in self.steps {
      whole_result &= run_step(step.as_ref(), &ctx).await;
    }
    whole_result
  }
}

/// No-op group recording whether `perform` was actually invoked.
///
/// Passed through the gate by the aggregation code to detect whether a
/// gated action set was entered for a branch, independent of whether real
/// steps would subsequently have failed.
#[derive(Debug, Default)]
pub struct MarkPerformed {
  performed: AtomicBool,
}

impl MarkPerformed {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn performed(&self) -> bool {
    self.performed.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl StepGroup for MarkPerformed {
  fn prebuild(&self, _ctx: &SharedContext) -> bool {
    true
  }

  async fn perform(&self, _ctx: SharedContext) -> bool {
    self.performed.store(true, Ordering::SeqCst);
    true
  }
}

fn run_prebuild(steps: &[Arc<dyn BuildStep>], ctx: &SharedContext) -> bool {
  for step in steps {
    if !step.prebuild(ctx) {
      event!(
        Level::DEBUG,
        step = step.display_name(),
        "prebuild declined, stopping pre-check"
      );
      return false;
    }
  }
  true
}

/// Runs one step's `perform`, converting failure, error, and panic into an
/// attributed log entry plus a FAILURE merge. Returns whether the step
/// succeeded.
async fn run_step(step: &dyn BuildStep, ctx: &SharedContext) -> bool {
  match AssertUnwindSafe(step.perform(ctx.clone())).catch_unwind().await {
    Ok(Ok(true)) => true,
    Ok(Ok(false)) => {
      event!(Level::WARN, step = step.display_name(), "step failed");
      let mut guard = ctx.write();
      guard
        .log_mut()
        .error(format!("[postflight] {} failed", step.display_name()));
      guard.set_result(Severity::Failure);
      false
    }
    Ok(Err(err)) => {
      event!(
        Level::ERROR,
        step = step.display_name(),
        error = %err,
        "step aborted due to error"
      );
      let mut guard = ctx.write();
      guard.log_mut().error(format!(
        "[postflight] {} aborted due to error: {:#}",
        step.display_name(),
        err
      ));
      guard.set_result(Severity::Failure);
      false
    }
    Err(panic) => {
      let message = panic_message(panic.as_ref());
      event!(
        Level::ERROR,
        step = step.display_name(),
        panic = %message,
        "step aborted due to panic"
      );
      let mut guard = ctx.write();
      guard.log_mut().error(format!(
        "[postflight] {} aborted due to panic: {}",
        step.display_name(),
        message
      ));
      guard.set_result(Severity::Failure);
      false
    }
  }
}

/// Best-effort extraction of a panic payload's message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "<non-string panic payload>".to_string()
  }
}
