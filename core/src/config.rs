// postflight/src/config.rs

//! Persisted-configuration specs, the one-time legacy migration, and the
//! loader that resolves specs into executable units through an injected
//! registry.
//!
//! The persistence format itself belongs to the host; this module only
//! defines the shape the five persisted fields must be deserialized into
//! before execution begins.

use tracing::{event, Level};

use crate::error::PostflightResult;
use crate::orchestrator::Orchestrator;
use crate::registry::{ComponentParams, ComponentRegistry};
use crate::strategy::StrategyKind;
use crate::unit::ConditionalUnit;

/// One persisted component reference: a registered kind plus its
/// parameters.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
  pub kind: String,
  pub params: ComponentParams,
}

impl ComponentSpec {
  pub fn new(kind: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      params: ComponentParams::new(),
    }
  }

  pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.params = self.params.with(key, value);
    self
  }
}

/// Aggregation condition/strategy pair. Persisted either complete or not at
/// all; there is no partial form.
#[derive(Debug, Clone)]
pub struct AggregationSpec {
  pub condition: ComponentSpec,
  pub strategy: StrategyKind,
}

/// One persisted conditional unit.
///
/// `step` is the legacy single-step field written by configurations
/// predating step lists; [`UnitSpec::migrate`] folds it into `steps`.
#[derive(Debug, Clone)]
pub struct UnitSpec {
  pub condition: ComponentSpec,
  pub step: Option<ComponentSpec>,
  pub steps: Vec<Option<ComponentSpec>>,
  pub strategy: StrategyKind,
  pub aggregation: Option<AggregationSpec>,
}

impl UnitSpec {
  pub fn new(condition: ComponentSpec) -> Self {
    Self {
      condition,
      step: None,
      steps: Vec::new(),
      strategy: StrategyKind::default(),
      aggregation: None,
    }
  }

  pub fn with_step(mut self, step: ComponentSpec) -> Self {
    self.steps.push(Some(step));
    self
  }

  pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
    self.strategy = strategy;
    self
  }

  pub fn with_aggregation(mut self, condition: ComponentSpec, strategy: StrategyKind) -> Self {
    self.aggregation = Some(AggregationSpec { condition, strategy });
    self
  }

  /// One-time migration run during load: promotes the legacy single-step
  /// field to the list form and prunes null entries left by partial saves.
  /// Idempotent — already-migrated specs pass through unchanged.
  pub fn migrate(mut self) -> Self {
    if let Some(step) = self.step.take() {
      event!(
        Level::DEBUG,
        kind = step.kind.as_str(),
        "promoting legacy single-step field to step list"
      );
      self.steps.insert(0, Some(step));
    }
    self.steps.retain(Option::is_some);
    self
  }
}

/// Resolves persisted specs into executable units. The registry is
/// injected; nothing is discovered from ambient state.
pub struct ConfigLoader<'a> {
  registry: &'a ComponentRegistry,
}

impl<'a> ConfigLoader<'a> {
  pub fn new(registry: &'a ComponentRegistry) -> Self {
    Self { registry }
  }

  pub fn load_unit(&self, spec: UnitSpec) -> PostflightResult<ConditionalUnit> {
    let spec = spec.migrate();

    let condition = self
      .registry
      .create_condition(&spec.condition.kind, &spec.condition.params)?;

    let mut steps = Vec::with_capacity(spec.steps.len());
    for step_spec in spec.steps.iter().flatten() {
      steps.push(self.registry.create_step(&step_spec.kind, &step_spec.params)?);
    }

    let mut unit = ConditionalUnit::new(condition, steps, spec.strategy.instantiate());
    if let Some(aggregation) = spec.aggregation {
      let agg_condition = self
        .registry
        .create_condition(&aggregation.condition.kind, &aggregation.condition.params)?;
      unit = unit.with_aggregation(agg_condition, aggregation.strategy.instantiate());
    }
    Ok(unit)
  }

  /// Loads a whole configured orchestrator, preserving unit order.
  pub fn load(&self, specs: Vec<UnitSpec>) -> PostflightResult<Orchestrator> {
    let mut units = Vec::with_capacity(specs.len());
    for spec in specs {
      units.push(self.load_unit(spec)?);
    }
    Ok(Orchestrator::new(units))
  }
}
