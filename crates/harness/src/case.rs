//! Test case declaration and soft assertions.
//!
//! A [`TestCase`] names a configuration file and what to expect from running
//! it. The optional predicate records [`AssertionFailure`]s into a
//! [`Collect`] without aborting; the poller re-evaluates it until a round
//! records none.
//!
//! ```ignore
//! let case = TestCase::builder("tests/testdata/scrape_and_write.toml")
//!     .predicate(|c, h| {
//!         c.greater_or_equal("writes", h.writes_count() as f64, 1.0);
//!     })
//!     .require_clean_shutdown(false)
//!     .build();
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::runtime::RuntimeHandle;

/// One soft failure from one evaluation round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    message: String,
}

impl AssertionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Failure collector passed to a predicate.
#[derive(Debug, Default)]
pub struct Collect {
    failures: Vec<AssertionFailure>,
}

impl Collect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an unconditional failure.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.failures.push(AssertionFailure::new(message));
    }

    /// `actual == expected`
    pub fn equal<T: PartialEq + fmt::Debug>(&mut self, what: &str, actual: T, expected: T) {
        if actual != expected {
            self.fail(format!("{what}: expected {expected:?}, got {actual:?}"));
        }
    }

    /// `actual > bound`
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn greater(&mut self, what: &str, actual: f64, bound: f64) {
        if !(actual > bound) {
            self.fail(format!("{what}: expected > {bound}, got {actual}"));
        }
    }

    /// `actual >= bound`
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn greater_or_equal(&mut self, what: &str, actual: f64, bound: f64) {
        if !(actual >= bound) {
            self.fail(format!("{what}: expected >= {bound}, got {actual}"));
        }
    }

    /// `count > 0`
    pub fn not_empty(&mut self, what: &str, count: usize) {
        if count == 0 {
            self.fail(format!("{what}: expected at least one, got none"));
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[AssertionFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<AssertionFailure> {
        self.failures
    }
}

/// Assertion predicate evaluated against the running engine.
pub type Predicate = Arc<dyn Fn(&mut Collect, &RuntimeHandle) + Send + Sync>;

/// An immutable pipeline test declaration.
#[derive(Clone)]
pub struct TestCase {
    config_path: PathBuf,
    predicate: Option<Predicate>,
    expected_error: Option<String>,
    require_clean_shutdown: bool,
}

impl TestCase {
    /// Start declaring a case for the configuration at `config_path`.
    pub fn builder(config_path: impl Into<PathBuf>) -> TestCaseBuilder {
        TestCaseBuilder {
            case: TestCase {
                config_path: config_path.into(),
                predicate: None,
                expected_error: None,
                require_clean_shutdown: false,
            },
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn expected_error(&self) -> Option<&str> {
        self.expected_error.as_deref()
    }

    pub fn require_clean_shutdown(&self) -> bool {
        self.require_clean_shutdown
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("config_path", &self.config_path)
            .field("has_predicate", &self.predicate.is_some())
            .field("expected_error", &self.expected_error)
            .field("require_clean_shutdown", &self.require_clean_shutdown)
            .finish()
    }
}

/// Builder for [`TestCase`].
pub struct TestCaseBuilder {
    case: TestCase,
}

impl TestCaseBuilder {
    /// Assertions that must converge before shutdown.
    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&mut Collect, &RuntimeHandle) + Send + Sync + 'static,
    {
        self.case.predicate = Some(Arc::new(predicate));
        self
    }

    /// Substring the engine's exit error must contain.
    pub fn expected_error(mut self, substring: impl Into<String>) -> Self {
        self.case.expected_error = Some(substring.into());
        self
    }

    /// Make a missed shutdown grace window fatal.
    pub fn require_clean_shutdown(mut self, required: bool) -> Self {
        self.case.require_clean_shutdown = required;
        self
    }

    pub fn build(self) -> TestCase {
        self.case
    }
}
