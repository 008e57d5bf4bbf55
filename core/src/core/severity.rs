// postflight/src/core/severity.rs

//! The ordered build-result severity and its worsen-only combination rule.

use std::fmt;
use std::str::FromStr;

use crate::error::PostflightError;

/// Outcome severity of one build, ordered from best to worst.
///
/// The derived ordering is what `combine` and the context's worsen-only
/// setter rely on: `Success < Unstable < Failure < NotBuilt < Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
  #[default]
  Success,
  Unstable,
  Failure,
  NotBuilt,
  Aborted,
}

impl Severity {
  /// Returns the worse of the two severities.
  pub fn combine(self, other: Severity) -> Severity {
    self.max(other)
  }

  pub fn is_worse_than(self, other: Severity) -> bool {
    self > other
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Severity::Success => "SUCCESS",
      Severity::Unstable => "UNSTABLE",
      Severity::Failure => "FAILURE",
      Severity::NotBuilt => "NOT_BUILT",
      Severity::Aborted => "ABORTED",
    };
    f.write_str(name)
  }
}

impl FromStr for Severity {
  type Err = PostflightError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_uppercase().as_str() {
      "SUCCESS" => Ok(Severity::Success),
      "UNSTABLE" => Ok(Severity::Unstable),
      "FAILURE" => Ok(Severity::Failure),
      "NOT_BUILT" => Ok(Severity::NotBuilt),
      "ABORTED" => Ok(Severity::Aborted),
      other => Err(PostflightError::Configuration {
        message: format!("unknown severity '{}'", other),
      }),
    }
  }
}
