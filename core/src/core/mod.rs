// postflight/src/core/mod.rs

//! Core data model: the build context, the result severity, and the
//! collaborator traits (`BuildStep`, `RunCondition`) the host implements.

pub mod condition;
pub mod context;
pub mod severity;
pub mod step;

pub use condition::{AlwaysRun, NeverRun, RunCondition, StatusCondition};
pub use context::{BuildContext, BuildLog, LogEntry, LogLevel, SharedContext};
pub use severity::Severity;
pub use step::{
  step_list_name, Aggregatable, BuildStep, DeclaredDependency, DeclaresDependencies,
  DependencyCollector,
};
