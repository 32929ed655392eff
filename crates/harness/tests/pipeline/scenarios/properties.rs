//! Harness-level guarantees that hold for any pipeline.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serial_test::serial;

use flowline_core::telemetry;
use flowline_harness::{HarnessError, Orchestrator, TestCase};

use crate::helpers::predicates::never_converges;
use crate::helpers::testdata::{init, quick_config, testdata};

/// Engine exit before convergence -> verdict from the exit error alone.
#[tokio::test]
#[serial]
async fn test_exit_before_convergence_skips_shutdown() {
    init();

    // Given: a pipeline that fails to load and a predicate that never passes
    let (predicate, _rounds) = never_converges();
    let case = TestCase::builder(testdata("invalid.toml"))
        .predicate(predicate)
        .expected_error("could not perform the initial load successfully")
        .require_clean_shutdown(true)
        .build();

    // When
    let report = Orchestrator::new(quick_config(Duration::from_secs(10), Duration::from_secs(5)))
        .run(&case)
        .await
        .expect("the exit error matches");

    // Then
    assert!(report.outcome.is_process_exited());
    assert!(report.notes.is_empty());
}

/// Deadline with a failing predicate -> the last round's failures.
#[tokio::test]
#[serial]
async fn test_deadline_reports_last_round_failures() {
    init();

    let (predicate, rounds) = never_converges();
    let case = TestCase::builder(testdata("empty.toml"))
        .predicate(predicate)
        .build();

    let err = Orchestrator::new(quick_config(Duration::from_millis(500), Duration::from_millis(50)))
        .run(&case)
        .await
        .unwrap_err();
    let evaluated = rounds.load(Ordering::SeqCst);

    match err {
        HarnessError::AssertionTimeout { deadline, failures } => {
            assert_eq!(deadline, Duration::from_millis(500));
            assert!(evaluated >= 2, "expected several rounds, got {evaluated}");
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].message(), format!("round {evaluated}"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Deadline before the first round -> harness deadline, not an assertion
/// timeout.
#[tokio::test]
#[serial]
async fn test_deadline_before_first_round() {
    init();

    let (predicate, rounds) = never_converges();
    let case = TestCase::builder(testdata("empty.toml"))
        .predicate(predicate)
        .build();

    let err = Orchestrator::new(quick_config(Duration::from_millis(200), Duration::from_secs(10)))
        .run(&case)
        .await
        .unwrap_err();

    assert_eq!(rounds.load(Ordering::SeqCst), 0);
    assert!(
        matches!(err, HarnessError::HarnessDeadline { .. }),
        "unexpected error: {err}"
    );
}

/// The telemetry registry is restored whether the test passes or fails.
#[tokio::test]
#[serial]
async fn test_metrics_scope_restored_after_pass_and_fail() {
    init();
    let before = telemetry::default_registry();
    let orchestrator = Orchestrator::default();

    let passing = TestCase::builder(testdata("empty.toml")).build();
    orchestrator.run(&passing).await.expect("empty pipeline passes");
    assert!(Arc::ptr_eq(&telemetry::default_registry(), &before));

    let failing = TestCase::builder(testdata("invalid.toml")).build();
    orchestrator.run(&failing).await.unwrap_err();
    assert!(Arc::ptr_eq(&telemetry::default_registry(), &before));
}

/// Engine telemetry lands in the test-local registry, not the global one.
#[tokio::test]
#[serial]
async fn test_engine_metrics_recorded_in_scope() {
    init();
    let scope = Arc::new(flowline_harness::MetricsScope::acquire().unwrap());
    let case = TestCase::builder(testdata("empty.toml")).build();

    Orchestrator::default()
        .run_in_scope(&scope, &case)
        .await
        .expect("empty pipeline passes");

    let rendered = scope.registry().render();
    assert!(rendered.contains("flowline_engine_build_info"), "{rendered}");
}
