use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use flowline_daemon::cli::{Cli, Command};
use flowline_daemon::{logging, run};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Command::Run(args) = &cli.command;
    let general = run::general_config(args).await;
    logging::init_tracing(&general)?;
    flowline_core::telemetry::install()?;

    tracing::info!(version = flowline_engine::VERSION, "flowline starting");

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match run::wait_for_shutdown_signal().await {
            Ok(signal) => {
                tracing::info!(signal, "shutdown signal received");
                signal_cancel.cancel();
            }
            Err(e) => tracing::error!(error = %e, "signal handling unavailable"),
        }
    });

    let result = run::execute(cli, cancel).await;
    match &result {
        Ok(()) => tracing::info!("flowline shut down"),
        Err(e) => tracing::error!(error = %format!("{e:#}"), "flowline exited with error"),
    }
    result
}
