//! Flowline daemon library.
//!
//! Exposes the CLI definition and the cancellable [`execute`] entry point so
//! that the pipeline can be launched in-process (the end-to-end harness does
//! exactly that). The `flowline` binary is a thin wrapper around it.

pub mod cli;
pub mod logging;
pub mod run;

pub use cli::{Cli, Command, RunArgs};
pub use run::execute;
