//! Exit error verification.

use crate::error::HarnessError;
use crate::signal::ExitError;

/// Check the engine's exit error against the expectation.
///
/// With an expected substring, the error must be present and its full
/// rendered chain must contain the substring. Without one (or with an empty
/// one), there must be no error.
pub fn verify_exit_error(
    expected: Option<&str>,
    actual: Option<&ExitError>,
) -> Result<(), HarnessError> {
    let expected = expected.filter(|s| !s.is_empty());
    match (expected, actual) {
        (None, None) => Ok(()),
        (None, Some(err)) => Err(HarnessError::UnexpectedExitError {
            actual: format!("{err:#}"),
        }),
        (Some(expected), None) => Err(HarnessError::MissingExitError {
            expected: expected.to_owned(),
        }),
        (Some(expected), Some(err)) => {
            let actual = format!("{err:#}");
            if actual.contains(expected) {
                Ok(())
            } else {
                Err(HarnessError::ExitErrorMismatch {
                    expected: expected.to_owned(),
                    actual,
                })
            }
        }
    }
}
