// postflight/src/error.rs

use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PostflightError {
  #[error("unknown step kind '{kind}'")]
  UnknownStepKind { kind: String },

  #[error("unknown condition kind '{kind}'")]
  UnknownConditionKind { kind: String },

  #[error("constructing step '{kind}' failed. Source: {source}")]
  StepConstruction {
    kind: String,
    #[source]
    source: AnyhowError,
  },

  #[error("constructing condition '{kind}' failed. Source: {source}")]
  ConditionConstruction {
    kind: String,
    #[source]
    source: AnyhowError,
  },

  #[error("configuration error: {message}")]
  Configuration { message: String },
}

pub type PostflightResult<T, E = PostflightError> = std::result::Result<T, E>;
