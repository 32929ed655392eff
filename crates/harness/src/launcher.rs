//! Engine launcher.
//!
//! Builds the engine's command line, parses it with the daemon's own CLI
//! definition and spawns [`flowline_daemon::execute`] on the current runtime.
//! The returned signal resolves exactly once with the task's terminal error
//! (or `None`), whatever ended it: success, failure, cancellation, panic or
//! a command line the daemon rejects. Nothing is retried.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use flowline_daemon::Cli;

use crate::runtime::RuntimeHandle;
use crate::signal::{CompletionSignal, ExitError};

/// Resolved engine invocation.
#[derive(Debug, Clone)]
pub struct LaunchArgs {
    pub config_path: PathBuf,
    pub listen_addr: SocketAddr,
    pub storage_path: PathBuf,
}

impl LaunchArgs {
    /// Arguments targeting the endpoints owned by `runtime`.
    pub fn new(config_path: &Path, runtime: &RuntimeHandle) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
            listen_addr: runtime.listen_addr(),
            storage_path: runtime.storage_path().to_path_buf(),
        }
    }

    /// `flowline run <config> --server.http.listen-addr <addr> --storage.path <dir>`
    pub fn argv(&self) -> Vec<OsString> {
        vec![
            "flowline".into(),
            "run".into(),
            self.config_path.clone().into_os_string(),
            "--server.http.listen-addr".into(),
            self.listen_addr.to_string().into(),
            "--storage.path".into(),
            self.storage_path.clone().into_os_string(),
        ]
    }
}

/// Start the engine without waiting for it.
pub fn launch(args: &LaunchArgs, scope: &CancellationToken) -> CompletionSignal<Option<ExitError>> {
    let done = CompletionSignal::new();

    let cli = match Cli::try_parse_from(args.argv()) {
        Ok(cli) => cli,
        Err(e) => {
            debug!(error = %e, "engine command line rejected");
            done.resolve(Some(Arc::new(anyhow::Error::new(e))));
            return done;
        }
    };

    info!(
        config = %args.config_path.display(),
        listen_addr = %args.listen_addr,
        "launching engine"
    );
    let engine = tokio::spawn(flowline_daemon::execute(cli, scope.clone()));

    let signal = done.clone();
    tokio::spawn(async move {
        let exit = match engine.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(Arc::new(e)),
            Err(join_err) => Some(Arc::new(anyhow::anyhow!("engine task failed: {join_err}"))),
        };
        match &exit {
            None => info!("engine exited cleanly"),
            Some(e) => info!(error = %format!("{e:#}"), "engine exited with error"),
        }
        signal.resolve(exit);
    });

    done
}
