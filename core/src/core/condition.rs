// postflight/src/core/condition.rs

//! The `RunCondition` collaborator trait and the stock conditions shipped
//! with the crate.

use super::context::SharedContext;
use super::severity::Severity;

/// A boolean predicate gating whether a step group runs.
///
/// Conditions are stateless and re-evaluated on every phase invocation;
/// results are never cached. An `Err` from `evaluate` is fatal to the gate
/// it occurs in and is never silently treated as `false`.
pub trait RunCondition: Send + Sync {
  /// Name used to attribute gate failures to this condition.
  fn display_name(&self) -> &str;

  fn evaluate(&self, ctx: &SharedContext) -> anyhow::Result<bool>;
}

impl std::fmt::Debug for dyn RunCondition {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RunCondition").field("display_name", &self.display_name()).finish()
  }
}

/// Always satisfied. The default condition for newly configured units.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRun;

impl RunCondition for AlwaysRun {
  fn display_name(&self) -> &str {
    "Always"
  }

  fn evaluate(&self, _ctx: &SharedContext) -> anyhow::Result<bool> {
    Ok(true)
  }
}

/// Never satisfied.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRun;

impl RunCondition for NeverRun {
  fn display_name(&self) -> &str {
    "Never"
  }

  fn evaluate(&self, _ctx: &SharedContext) -> anyhow::Result<bool> {
    Ok(false)
  }
}

/// Satisfied while the current build result is no worse than the configured
/// severity.
#[derive(Debug, Clone, Copy)]
pub struct StatusCondition {
  worst_allowed: Severity,
}

impl StatusCondition {
  pub fn new(worst_allowed: Severity) -> Self {
    Self { worst_allowed }
  }
}

impl RunCondition for StatusCondition {
  fn display_name(&self) -> &str {
    "Current build status"
  }

  fn evaluate(&self, ctx: &SharedContext) -> anyhow::Result<bool> {
    Ok(ctx.read().result() <= self.worst_allowed)
  }
}
