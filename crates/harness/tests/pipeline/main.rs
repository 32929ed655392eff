//! Pipeline tests: the engine runs in-process against a configuration file
//! while the harness races a deadline, an assertion poller and engine exit.
//!
//! # Test Structure
//!
//! - `helpers/` -- testdata paths, tracing setup, shared predicates
//! - `scenarios/` -- one file per scenario group
//!
//! Every test swaps the process-wide telemetry registry, so all of them run
//! under `#[serial]`.
//!
//! # Running
//!
//! ```bash
//! cargo test -p flowline-harness --test pipeline
//! ```

mod helpers;
mod scenarios;
