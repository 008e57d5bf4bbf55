// postflight/src/core/step.rs

//! The `BuildStep` collaborator trait, its optional capabilities, and
//! display-name helpers for step lists.

use async_trait::async_trait;
use std::sync::Arc;

use crate::aggregate::BranchAggregator;
use crate::core::condition::RunCondition;
use crate::core::context::SharedContext;

/// A single fallible unit of post-build work.
///
/// `perform` returning `Ok(false)` is a recoverable failure handled by the
/// active strategy; `Err` is an unrecoverable error, converted to a logged
/// failure at the step-group boundary and never propagated past it.
impl std::fmt::Debug for dyn BuildStep {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BuildStep").field("display_name", &self.display_name()).finish()
  }
}

#[async_trait]
pub trait BuildStep: Send + Sync {
  /// Name used to attribute log entries to this step.
  fn display_name(&self) -> &str;

  /// Establishes preconditions before the perform phase. Runs fail-fast
  /// regardless of the configured strategy, because later steps rely on the
  /// preconditions of earlier ones.
  fn prebuild(&self, ctx: &SharedContext) -> bool {
    let _ = ctx;
    true
  }

  /// Executes the step's work.
  async fn perform(&self, ctx: SharedContext) -> anyhow::Result<bool>;

  /// Present when this step can fold per-branch results of a fan-out build
  /// into a parent-level outcome.
  fn aggregatable(&self) -> Option<&dyn Aggregatable> {
    None
  }

  /// Present when this step declares downstream dependencies.
  fn dependency_declarer(&self) -> Option<&dyn DeclaresDependencies> {
    None
  }
}

/// Capability: the step participates in matrix aggregation.
pub trait Aggregatable: Send + Sync {
  /// Builds the per-matrix-build aggregation delegate. `None` means this
  /// particular configuration has nothing to aggregate.
  fn create_aggregator(&self, parent: SharedContext) -> Option<Box<dyn BranchAggregator>>;
}

/// A dependency declared by a step. The guard, when present, is the
/// condition of the unit owning the step; the host evaluates it before
/// triggering the downstream side.
pub struct DeclaredDependency {
  pub upstream: String,
  pub downstream: String,
  pub guard: Option<Arc<dyn RunCondition>>,
}

/// Sink for declared dependencies; implemented by the host.
pub trait DependencyCollector {
  fn add(&mut self, dependency: DeclaredDependency);
}

/// Capability: the step contributes edges to the host's dependency graph.
pub trait DeclaresDependencies: Send + Sync {
  fn declare_dependencies(&self, collector: &mut dyn DependencyCollector);
}

/// Short display name for a step list: `(None)`, a single step's name, or a
/// bracketed comma-separated list.
pub fn step_list_name(steps: &[Arc<dyn BuildStep>]) -> String {
  match steps {
    [] => "(None)".to_string(),
    [single] => single.display_name().to_string(),
    many => {
      let names: Vec<&str> = many.iter().map(|s| s.display_name()).collect();
      format!("[{}]", names.join(", "))
    }
  }
}
