//! Engine start/stop without assertions.

use serial_test::serial;

use flowline_harness::{HarnessError, TestCase, run_test_case};

use crate::helpers::testdata::{init, testdata};

/// Empty pipeline -> immediate convergence -> clean shutdown.
#[tokio::test]
#[serial]
async fn test_pipeline_empty_config_clean_shutdown() {
    init();

    // Given: a no-op pipeline and no predicate
    let case = TestCase::builder(testdata("empty.toml"))
        .require_clean_shutdown(true)
        .build();

    // When
    let report = run_test_case(&case).await.expect("empty pipeline should pass");

    // Then: convergence is immediate and the engine stopped in time
    assert!(report.outcome.is_converged());
    assert_eq!(report.rounds, 0);
    assert!(report.notes.is_empty());
}

/// An expected error that never happens fails after a clean shutdown.
#[tokio::test]
#[serial]
async fn test_pipeline_expected_error_missing() {
    init();

    let case = TestCase::builder(testdata("empty.toml"))
        .expected_error("could not perform the initial load successfully")
        .build();

    let err = run_test_case(&case).await.unwrap_err();
    assert!(
        matches!(err, HarnessError::MissingExitError { .. }),
        "unexpected error: {err}"
    );
}
