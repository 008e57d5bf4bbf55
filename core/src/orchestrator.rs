// postflight/src/orchestrator.rs

//! The orchestrator: drives prebuild and perform across an ordered list of
//! conditional units, isolating failures per unit so one unit's crash never
//! prevents sibling units from running.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{event, instrument, Level};

use crate::aggregate::AggregationCoordinator;
use crate::core::context::SharedContext;
use crate::core::severity::Severity;
use crate::core::step::DependencyCollector;
use crate::strategy::group::panic_message;
use crate::unit::ConditionalUnit;

#[derive(Debug)]
pub struct Orchestrator {
  units: Vec<ConditionalUnit>,
}

impl Orchestrator {
  /// Units execute in the given order; the order is preserved across every
  /// phase.
  pub fn new(units: Vec<ConditionalUnit>) -> Self {
    Self { units }
  }

  pub fn units(&self) -> &[ConditionalUnit] {
    &self.units
  }

  /// Pre-check phase. A unit's prebuild failure worsens the build result
  /// but never stops the iteration, and the phase itself cannot abort the
  /// build.
  #[instrument(name = "Orchestrator::prebuild", skip_all, fields(units = self.units.len()))]
  pub fn prebuild(&self, ctx: &SharedContext) {
    for unit in &self.units {
      if !unit.prebuild(ctx) {
        event!(Level::WARN, unit = %unit.display_name(), "prebuild failed");
        ctx.write().set_result(Severity::Failure);
      }
    }
  }

  /// Perform phase. Failure of one unit never prevents execution of the
  /// following units; a panic escaping a unit is caught here, logged with
  /// the unit's step names, and converted to a FAILURE merge. Returns the
  /// conjunction of the per-unit outcomes.
  #[instrument(name = "Orchestrator::perform", skip_all, fields(units = self.units.len()))]
  pub async fn perform(&self, ctx: SharedContext) -> bool {
    let mut whole_result = true;
    for unit in &self.units {
      match AssertUnwindSafe(unit.perform(ctx.clone())).catch_unwind().await {
        Ok(true) => {}
        Ok(false) => {
          // Failure details were already logged where they were detected.
          whole_result = false;
        }
        Err(panic) => {
          let message = panic_message(panic.as_ref());
          event!(
            Level::ERROR,
            unit = %unit.display_name(),
            panic = %message,
            "unit aborted due to panic"
          );
          let mut guard = ctx.write();
          guard.log_mut().error(format!(
            "[postflight] {} aborted due to panic: {}",
            unit.display_name(),
            message
          ));
          guard.set_result(Severity::Failure);
          whole_result = false;
        }
      }
    }
    whole_result
  }

  /// Builds the matrix aggregation coordinator for one parent build.
  /// Returns `None` when no unit supports aggregation — nothing to
  /// aggregate, not a failure.
  pub fn create_aggregation(&self, parent: &SharedContext) -> Option<AggregationCoordinator> {
    let aggregators: Vec<_> = self
      .units
      .iter()
      .filter_map(|unit| unit.create_aggregation(parent))
      .collect();

    if aggregators.is_empty() {
      return None;
    }
    Some(AggregationCoordinator::new(aggregators))
  }

  /// Pass-through to every unit's dependency hook.
  pub fn declare_dependencies(&self, collector: &mut dyn DependencyCollector) {
    for unit in &self.units {
      unit.declare_dependencies(collector);
    }
  }
}
