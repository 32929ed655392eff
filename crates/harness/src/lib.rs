//! Flowline pipeline test harness.
//!
//! Runs the engine in-process against a configuration file and decides a
//! verdict by racing three things: a global deadline, an assertion poller
//! re-evaluating a user predicate, and the engine's own exit.
//!
//! # Usage
//! ```ignore
//! let case = TestCase::builder("testdata/scrape_and_write.toml")
//!     .predicate(|c, rt| c.not_empty("write requests", rt.writes_count()))
//!     .build();
//! run_test_case(&case).await?;
//! ```

pub mod capture;
pub mod case;
pub mod config;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod metrics_scope;
pub mod orchestrator;
pub mod poller;
pub mod race;
pub mod runtime;
pub mod signal;
pub mod verify;

pub use case::{AssertionFailure, Collect, Predicate, TestCase, TestCaseBuilder};
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use metrics_scope::MetricsScope;
pub use orchestrator::{Orchestrator, TestReport, run_test_case};
pub use race::Outcome;
pub use runtime::RuntimeHandle;
pub use signal::{CompletionSignal, ExitError};
