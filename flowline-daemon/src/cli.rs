//! CLI argument definitions for the `flowline` binary.
//!
//! Uses `clap` v4 derive macros. Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Default status surface listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:12345";

/// Default storage directory.
pub const DEFAULT_STORAGE_PATH: &str = "data-flowline";

/// Flowline metrics pipeline.
///
/// Use `flowline <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "flowline", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a pipeline until interrupted.
    Run(RunArgs),
}

/// Arguments of `flowline run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the pipeline configuration file.
    pub config: PathBuf,

    /// Address the status surface (`/metrics`, `/-/ready`) listens on.
    #[arg(long = "server.http.listen-addr", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: String,

    /// Directory for on-disk state such as write-ahead logs.
    #[arg(long = "storage.path", default_value = DEFAULT_STORAGE_PATH)]
    pub storage_path: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,
}
