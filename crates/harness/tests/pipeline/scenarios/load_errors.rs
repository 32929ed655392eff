//! Configurations the engine refuses to load.
//!
//! The engine exits on its own before any predicate can converge; the
//! harness only checks the exit error.

use serial_test::serial;

use flowline_harness::{HarnessError, TestCase, run_test_case};

use crate::helpers::testdata::{init, testdata};

/// Missing configuration file -> exit error naming the path.
#[tokio::test]
#[serial]
async fn test_pipeline_missing_config_file() {
    init();

    // Given: a path that does not exist
    let case = TestCase::builder("does_not_exist.toml")
        .expected_error("does_not_exist.toml: no such file or directory")
        .build();

    // When / Then: the expected error is observed
    let report = run_test_case(&case).await.expect("missing file should be reported");
    assert!(report.notes.is_empty());
}

/// Invalid component wiring -> initial load failure.
#[tokio::test]
#[serial]
async fn test_pipeline_invalid_config() {
    init();

    let case = TestCase::builder(testdata("invalid.toml"))
        .expected_error("could not perform the initial load successfully")
        .build();

    run_test_case(&case).await.expect("load error should be reported");
}

/// Expecting the wrong error fails the test with both messages.
#[tokio::test]
#[serial]
async fn test_pipeline_wrong_expected_error() {
    init();

    let case = TestCase::builder("does_not_exist.toml")
        .expected_error("could not perform the initial load successfully")
        .build();

    let err = run_test_case(&case).await.unwrap_err();
    match err {
        HarnessError::ExitErrorMismatch { expected, actual } => {
            assert_eq!(expected, "could not perform the initial load successfully");
            assert!(actual.contains("no such file or directory"), "actual: {actual}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// A load error nobody expected is a failure.
#[tokio::test]
#[serial]
async fn test_pipeline_unexpected_load_error() {
    init();

    let case = TestCase::builder(testdata("invalid.toml")).build();

    let err = run_test_case(&case).await.unwrap_err();
    assert!(
        matches!(err, HarnessError::UnexpectedExitError { .. }),
        "unexpected error: {err}"
    );
}
