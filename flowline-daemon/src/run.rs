//! `flowline run`: load a pipeline and run it until cancelled.
//!
//! [`execute`] is the cancellable entry point shared by the binary and by
//! in-process callers. It never installs global state (logging, recorder);
//! that is the binary's job.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use flowline_core::config::{FlowlineConfig, GeneralConfig};
use flowline_engine::{Engine, RunOptions};

use crate::cli::{Cli, Command, RunArgs};

/// Execute a parsed command line until it finishes or `cancel` fires.
pub async fn execute(cli: Cli, cancel: CancellationToken) -> Result<()> {
    match cli.command {
        Command::Run(args) => run(args, cancel).await,
    }
}

async fn run(args: RunArgs, cancel: CancellationToken) -> Result<()> {
    let options = RunOptions {
        listen_addr: args.listen_addr,
        storage_path: args.storage_path,
    };
    let engine = Engine::load(&args.config, options).await?;
    info!(
        config = %args.config.display(),
        listen_addr = %engine.options().listen_addr,
        storage_path = %engine.options().storage_path.display(),
        "starting pipeline"
    );
    engine.run(cancel).await?;
    Ok(())
}

/// Logging settings for `args`: the config's `[general]` section when it
/// loads, defaults otherwise, then CLI overrides.
///
/// Load failures are ignored here; [`execute`] reports them.
pub async fn general_config(args: &RunArgs) -> GeneralConfig {
    let mut general = FlowlineConfig::load(&args.config)
        .await
        .map(|config| config.general)
        .unwrap_or_default();
    if let Some(level) = &args.log_level {
        general.log_level = level.clone();
    }
    if let Some(format) = &args.log_format {
        general.log_format = format.clone();
    }
    general
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
