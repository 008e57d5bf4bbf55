// postflight/src/aggregate/mod.rs

//! Fan-out (matrix) aggregation: per-branch results are folded back into a
//! parent-level outcome through a three-phase protocol driven by the host
//! at the corresponding build lifecycle points.

mod conditional;
mod coordinator;

pub use conditional::ConditionalAggregator;
pub use coordinator::AggregationCoordinator;

use async_trait::async_trait;

use crate::core::context::SharedContext;

/// One completed fan-out branch: an axis combination's identifier and that
/// branch's own execution context.
pub struct BranchRun {
  pub id: String,
  pub context: SharedContext,
}

impl BranchRun {
  pub fn new(id: impl Into<String>, context: SharedContext) -> Self {
    Self {
      id: id.into(),
      context,
    }
  }
}

/// Per-matrix-build delegate collecting branch outcomes into a parent-level
/// result. Provided by steps through the
/// [`Aggregatable`](crate::core::step::Aggregatable) capability and
/// discarded when the parent build ends.
///
/// All hooks default to successful no-ops; implementors override what they
/// need. The host (through the coordinator) invokes `start_build` once,
/// then `end_branch` once per completed branch, then `end_build` once, in
/// that order.
#[async_trait]
pub trait BranchAggregator: Send + Sync {
  fn display_name(&self) -> &str;

  /// Called when the parent build starts.
  async fn start_build(&self) -> anyhow::Result<bool> {
    Ok(true)
  }

  /// Called when a branch finishes.
  async fn end_branch(&self, branch: &BranchRun) -> anyhow::Result<bool> {
    let _ = branch;
    Ok(true)
  }

  /// Called when the parent build finishes, after all branches completed.
  async fn end_build(&self) -> anyhow::Result<bool> {
    Ok(true)
  }
}
