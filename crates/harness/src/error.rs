//! Harness error types.
//!
//! Every variant is fatal for the single test case that produced it. Engine
//! exit errors are carried as rendered text only; the harness never
//! interprets them beyond substring containment.

use std::time::Duration;

use crate::case::AssertionFailure;

/// A fatal test-case failure.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The deadline fired while the predicate was still failing.
    #[error(
        "assertions did not converge within {deadline:?}; last round reported {} failure(s):\n{}",
        .failures.len(),
        render_failures(.failures)
    )]
    AssertionTimeout {
        /// Deadline that expired
        deadline: Duration,
        /// Failures of the most recent evaluation round
        failures: Vec<AssertionFailure>,
    },

    /// The deadline fired before any signal resolved or any round failed.
    #[error("harness deadline of {deadline:?} exceeded before the engine exited or assertions converged")]
    HarnessDeadline {
        /// Deadline that expired
        deadline: Duration,
    },

    /// The engine did not stop within the grace window after cancellation.
    #[error("engine failed to shut down within {grace:?}")]
    ShutdownTimeout {
        /// Grace window that expired
        grace: Duration,
    },

    /// An exit error was expected but the engine exited cleanly.
    #[error("expected an exit error containing '{expected}', but the engine exited without error")]
    MissingExitError {
        /// Expected substring
        expected: String,
    },

    /// The exit error does not contain the expected substring.
    #[error("exit error '{actual}' does not contain '{expected}'")]
    ExitErrorMismatch {
        /// Expected substring
        expected: String,
        /// Rendered exit error
        actual: String,
    },

    /// No exit error was expected but the engine reported one.
    #[error("engine exited with unexpected error: {actual}")]
    UnexpectedExitError {
        /// Rendered exit error
        actual: String,
    },

    /// A harness setting holds an unusable value.
    #[error("invalid harness config value for '{field}': {reason}")]
    InvalidConfig {
        /// Setting name
        field: String,
        /// Why the value is rejected
        reason: String,
    },

    /// The test environment could not be prepared.
    #[error("test setup failed: {0}")]
    Setup(String),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn render_failures(failures: &[AssertionFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  - {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}
