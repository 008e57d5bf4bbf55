// postflight/src/registry.rs

//! A discriminator-keyed registry mapping step and condition kinds to their
//! factories. Resolution happens once, at configuration-load time; nothing
//! is looked up during execution.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{event, Level};

use crate::core::condition::{AlwaysRun, NeverRun, RunCondition, StatusCondition};
use crate::core::severity::Severity;
use crate::core::step::BuildStep;
use crate::error::{PostflightError, PostflightResult};

/// String key/value parameters carried by a persisted component spec.
#[derive(Debug, Clone, Default)]
pub struct ComponentParams {
  values: HashMap<String, String>,
}

impl ComponentParams {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.values.insert(key.into(), value.into());
    self
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.values.get(key).map(String::as_str)
  }
}

pub type StepFactory =
  Arc<dyn Fn(&ComponentParams) -> anyhow::Result<Arc<dyn BuildStep>> + Send + Sync>;
pub type ConditionFactory =
  Arc<dyn Fn(&ComponentParams) -> anyhow::Result<Arc<dyn RunCondition>> + Send + Sync>;

/// The registry. The host registers its step and condition implementations
/// at startup and hands the registry to the configuration loader; execution
/// never consults it.
#[derive(Default)]
pub struct ComponentRegistry {
  steps: Mutex<HashMap<String, StepFactory>>,
  conditions: Mutex<HashMap<String, ConditionFactory>>,
}

impl ComponentRegistry {
  /// Creates a new, empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry pre-populated with the stock conditions: `always`, `never`,
  /// and `status` (parameter `worst_allowed`).
  pub fn with_builtin_conditions() -> Self {
    let registry = Self::new();
    registry.register_condition("always", |_params| {
      Ok(Arc::new(AlwaysRun) as Arc<dyn RunCondition>)
    });
    registry.register_condition("never", |_params| {
      Ok(Arc::new(NeverRun) as Arc<dyn RunCondition>)
    });
    registry.register_condition("status", |params| {
      let worst = params
        .get("worst_allowed")
        .ok_or_else(|| anyhow::anyhow!("missing parameter 'worst_allowed'"))?
        .parse::<Severity>()?;
      Ok(Arc::new(StatusCondition::new(worst)) as Arc<dyn RunCondition>)
    });
    registry
  }

  pub fn register_step(
    &self,
    kind: impl Into<String>,
    factory: impl Fn(&ComponentParams) -> anyhow::Result<Arc<dyn BuildStep>> + Send + Sync + 'static,
  ) {
    let kind = kind.into();
    event!(Level::DEBUG, kind = kind.as_str(), "registering step factory");
    self.steps.lock().unwrap().insert(kind, Arc::new(factory));
  }

  pub fn register_condition(
    &self,
    kind: impl Into<String>,
    factory: impl Fn(&ComponentParams) -> anyhow::Result<Arc<dyn RunCondition>> + Send + Sync + 'static,
  ) {
    let kind = kind.into();
    event!(Level::DEBUG, kind = kind.as_str(), "registering condition factory");
    self.conditions.lock().unwrap().insert(kind, Arc::new(factory));
  }

  pub fn create_step(
    &self,
    kind: &str,
    params: &ComponentParams,
  ) -> PostflightResult<Arc<dyn BuildStep>> {
    let factory = self
      .steps
      .lock()
      .unwrap()
      .get(kind)
      .cloned()
      .ok_or_else(|| PostflightError::UnknownStepKind {
        kind: kind.to_string(),
      })?;
    factory(params).map_err(|source| PostflightError::StepConstruction {
      kind: kind.to_string(),
      source,
    })
  }

  pub fn create_condition(
    &self,
    kind: &str,
    params: &ComponentParams,
  ) -> PostflightResult<Arc<dyn RunCondition>> {
    let factory = self
      .conditions
      .lock()
      .unwrap()
      .get(kind)
      .cloned()
      .ok_or_else(|| PostflightError::UnknownConditionKind {
        kind: kind.to_string(),
      })?;
    factory(params).map_err(|source| PostflightError::ConditionConstruction {
      kind: kind.to_string(),
      source,
    })
  }
}
