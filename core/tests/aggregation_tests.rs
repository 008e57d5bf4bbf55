// tests/aggregation_tests.rs
mod common;

use common::*;
use postflight::{
  AlwaysRun, BranchRun, BuildStep, ConditionalUnit, ExecutionStrategy, FailAtEnd, FailFast,
  NeverRun, Orchestrator, Severity, StatusCondition,
};
use serial_test::serial;
use std::sync::Arc;

fn aggregating_unit(
  condition: impl postflight::RunCondition + 'static,
  strategy: impl ExecutionStrategy + 'static,
  aggregator: &Arc<CountingAggregator>,
) -> ConditionalUnit {
  ConditionalUnit::new(
    Arc::new(condition),
    vec![Arc::new(AggregatingStep::new(aggregator.name(), aggregator.clone())) as Arc<dyn BuildStep>],
    Arc::new(strategy),
  )
}

#[test]
#[serial]
fn test_units_without_aggregatable_steps_produce_no_coordinator() {
  setup_tracing();
  let orchestrator = Orchestrator::new(vec![ConditionalUnit::new(
    Arc::new(AlwaysRun),
    vec![Arc::new(RecordingStep::succeeding("plain"))],
    Arc::new(FailAtEnd),
  )]);
  let parent = new_context();

  assert!(
    orchestrator.create_aggregation(&parent).is_none(),
    "no eligible unit means no coordinator at all, not an empty one"
  );
}

#[test]
#[serial]
fn test_only_eligible_units_contribute() {
  setup_tracing();
  let aggregator = CountingAggregator::succeeding("collector");
  let orchestrator = Orchestrator::new(vec![
    ConditionalUnit::new(
      Arc::new(AlwaysRun),
      vec![Arc::new(RecordingStep::succeeding("plain"))],
      Arc::new(FailAtEnd),
    ),
    aggregating_unit(AlwaysRun, FailAtEnd, &aggregator),
  ]);
  let parent = new_context();

  let coordinator = orchestrator.create_aggregation(&parent).expect("one unit is eligible");
  assert_eq!(coordinator.unit_count(), 1);
}

#[tokio::test]
#[serial]
async fn test_two_branch_matrix_with_main_condition_fallback() {
  setup_tracing();
  // No aggregation override configured: per-branch gating falls back to the
  // unit's main condition, evaluated in each branch's own context.
  let aggregator = CountingAggregator::succeeding("collector");
  let orchestrator = Orchestrator::new(vec![aggregating_unit(
    StatusCondition::new(Severity::Success),
    FailAtEnd,
    &aggregator,
  )]);
  let parent = new_context();
  let coordinator = orchestrator.create_aggregation(&parent).unwrap();

  assert!(coordinator.start_build().await);

  let branch_1 = BranchRun::new("axis=linux", new_context());
  let branch_2 = BranchRun::new("axis=windows", new_context());
  branch_2.context.write().set_result(Severity::Failure);

  assert!(coordinator.end_branch(&branch_1).await);
  assert!(coordinator.end_branch(&branch_2).await, "a skipped branch is not a failure");
  assert!(coordinator.end_build().await);

  assert_eq!(aggregator.times_started(), 1);
  assert_eq!(
    aggregator.branches_seen(),
    vec!["axis=linux"],
    "only the branch satisfying the condition contributes"
  );
  assert_eq!(aggregator.times_ended(), 1);
}

#[tokio::test]
#[serial]
async fn test_aggregation_condition_overrides_main_condition() {
  setup_tracing();
  // Main condition never fires, but the aggregation condition does: the
  // per-branch hook runs regardless of what perform would have done.
  let aggregator = CountingAggregator::succeeding("collector");
  let unit = aggregating_unit(NeverRun, FailAtEnd, &aggregator)
    .with_aggregation(Arc::new(AlwaysRun), Arc::new(FailAtEnd));
  let orchestrator = Orchestrator::new(vec![unit]);
  let parent = new_context();
  let coordinator = orchestrator.create_aggregation(&parent).unwrap();

  let branch = BranchRun::new("axis=linux", new_context());
  assert!(coordinator.end_branch(&branch).await);
  assert_eq!(aggregator.branches_seen(), vec!["axis=linux"]);
}

#[tokio::test]
#[serial]
async fn test_main_condition_used_when_no_override() {
  setup_tracing();
  let aggregator = CountingAggregator::succeeding("collector");
  let orchestrator = Orchestrator::new(vec![aggregating_unit(NeverRun, FailAtEnd, &aggregator)]);
  let parent = new_context();
  let coordinator = orchestrator.create_aggregation(&parent).unwrap();

  let branch = BranchRun::new("axis=linux", new_context());
  assert!(coordinator.end_branch(&branch).await);
  assert!(aggregator.branches_seen().is_empty());
}

#[tokio::test]
#[serial]
async fn test_erroring_aggregation_condition_fails_branch_phase() {
  setup_tracing();
  let aggregator = CountingAggregator::succeeding("collector");
  let unit = aggregating_unit(AlwaysRun, FailAtEnd, &aggregator)
    .with_aggregation(Arc::new(ErroringCondition), Arc::new(FailAtEnd));
  let orchestrator = Orchestrator::new(vec![unit]);
  let parent = new_context();
  let coordinator = orchestrator.create_aggregation(&parent).unwrap();

  let branch = BranchRun::new("axis=linux", new_context());
  assert!(!coordinator.end_branch(&branch).await);
  assert!(aggregator.branches_seen().is_empty());
  assert!(log_errors(&branch.context)[0].contains("could not be evaluated"));
}

#[tokio::test]
#[serial]
async fn test_start_phase_is_fail_fast_across_units() {
  setup_tracing();
  let refusing = Arc::new(CountingAggregator::new(
    "refusing",
    HookOutcome::Fail,
    HookOutcome::Succeed,
    HookOutcome::Succeed,
  ));
  let never_started = CountingAggregator::succeeding("never-started");
  let orchestrator = Orchestrator::new(vec![
    aggregating_unit(AlwaysRun, FailAtEnd, &refusing),
    aggregating_unit(AlwaysRun, FailAtEnd, &never_started),
  ]);
  let parent = new_context();
  let coordinator = orchestrator.create_aggregation(&parent).unwrap();

  assert!(!coordinator.start_build().await);
  assert_eq!(refusing.times_started(), 1);
  assert_eq!(never_started.times_started(), 0);
}

#[tokio::test]
#[serial]
async fn test_end_build_fail_fast_stops_at_first_failure() {
  setup_tracing();
  let failing = Arc::new(CountingAggregator::new(
    "first",
    HookOutcome::Succeed,
    HookOutcome::Succeed,
    HookOutcome::Fail,
  ));
  let following = CountingAggregator::succeeding("second");
  let unit = ConditionalUnit::new(
    Arc::new(AlwaysRun),
    vec![
      Arc::new(AggregatingStep::new("first", failing.clone())) as Arc<dyn BuildStep>,
      Arc::new(AggregatingStep::new("second", following.clone())),
    ],
    Arc::new(FailFast),
  );
  let orchestrator = Orchestrator::new(vec![unit]);
  let parent = new_context();
  let coordinator = orchestrator.create_aggregation(&parent).unwrap();

  assert!(!coordinator.end_build().await);
  assert_eq!(failing.times_ended(), 1);
  assert_eq!(following.times_ended(), 0);
  assert_eq!(parent.read().result(), Severity::Failure);
  assert!(log_errors(&parent)[0].contains("aggregation with first failed"));
}

#[tokio::test]
#[serial]
async fn test_end_build_fail_at_end_drives_all_aggregators() {
  setup_tracing();
  let erroring = Arc::new(CountingAggregator::new(
    "first",
    HookOutcome::Succeed,
    HookOutcome::Succeed,
    HookOutcome::Error("summary upload failed"),
  ));
  let following = CountingAggregator::succeeding("second");
  let unit = ConditionalUnit::new(
    Arc::new(AlwaysRun),
    vec![
      Arc::new(AggregatingStep::new("first", erroring.clone())) as Arc<dyn BuildStep>,
      Arc::new(AggregatingStep::new("second", following.clone())),
    ],
    Arc::new(FailAtEnd),
  );
  let orchestrator = Orchestrator::new(vec![unit]);
  let parent = new_context();
  let coordinator = orchestrator.create_aggregation(&parent).unwrap();

  assert!(!coordinator.end_build().await);
  assert_eq!(erroring.times_ended(), 1);
  assert_eq!(following.times_ended(), 1, "fail-at-end still drives every aggregator");
  assert_eq!(parent.read().result(), Severity::Failure);
  assert!(log_errors(&parent)[0].contains("aggregation with first aborted due to error"));
}
