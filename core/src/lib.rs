// postflight/src/lib.rs

//! Postflight: a conditional, multi-strategy post-processing orchestrator.
//!
//! An ordered list of conditional units — each a (condition, steps,
//! strategy) tuple — is driven through a pre-check and a perform phase:
//!  - The condition gates whether a unit's steps run at all; condition
//!    not met is not a failure.
//!  - The strategy (fail-fast or fail-at-end) decides how the step group
//!    reacts to a failing step.
//!  - The orchestrator isolates failures per unit so one unit's crash
//!    never prevents sibling units from running; outcomes fold into a
//!    worsen-only build result severity.
//!
//! For fan-out (matrix) builds the same condition-then-strategy shape
//! repeats one level up: eligible units contribute per-build aggregators,
//! and an [`AggregationCoordinator`] folds per-branch results back into
//! the parent build through a start / per-branch-end / end protocol.

pub mod aggregate;
pub mod config;
pub mod core;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod registry;
pub mod strategy;
pub mod unit;

// --- Re-exports for the public API ---

pub use crate::aggregate::{
  AggregationCoordinator, BranchAggregator, BranchRun, ConditionalAggregator,
};
pub use crate::config::{AggregationSpec, ComponentSpec, ConfigLoader, UnitSpec};
pub use crate::core::condition::{AlwaysRun, NeverRun, RunCondition, StatusCondition};
pub use crate::core::context::{BuildContext, BuildLog, LogEntry, LogLevel, SharedContext};
pub use crate::core::severity::Severity;
pub use crate::core::step::{
  step_list_name, Aggregatable, BuildStep, DeclaredDependency, DeclaresDependencies,
  DependencyCollector,
};
pub use crate::error::{PostflightError, PostflightResult};
pub use crate::orchestrator::Orchestrator;
pub use crate::registry::{ComponentParams, ComponentRegistry, ConditionFactory, StepFactory};
pub use crate::strategy::group::{FailAtEndGroup, FailFastGroup, MarkPerformed, StepGroup};
pub use crate::strategy::{
  AggregationPhaseContext, ExecutionStrategy, FailAtEnd, FailFast, StrategyContext, StrategyKind,
};
pub use crate::unit::{AggregationOverride, ConditionalUnit};
