//! Engine: loads a pipeline definition and supervises its components.
//!
//! # Lifecycle
//! 1. [`Engine::load`] reads and validates the configuration
//! 2. [`Engine::run`] prepares storage, binds the status surface and spawns
//!    every component into a `JoinSet`
//! 3. The engine waits for either its cancellation token or the first
//!    component to stop on its own
//! 4. Children are cancelled and drained; the terminal error (if any) is
//!    returned
//!
//! A component that returns before cancellation is an error even if it
//! returned `Ok(())`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use flowline_core::config::FlowlineConfig;
use flowline_core::metrics as m;

use crate::component::DynComponent;
use crate::error::EngineError;
use crate::remote_write::RemoteWriteComponent;
use crate::scrape::{BatchSender, ScrapeComponent};
use crate::status::StatusServer;

/// Subdirectory of the storage path holding per-component WALs.
pub const WAL_DIR: &str = "wal";

/// Runtime options supplied on the command line rather than in the config.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Status surface listen address (`host:port`)
    pub listen_addr: String,
    /// Root of on-disk state
    pub storage_path: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:12345".to_owned(),
            storage_path: PathBuf::from("data-flowline"),
        }
    }
}

/// A loaded, not yet running pipeline.
#[derive(Debug)]
pub struct Engine {
    config: FlowlineConfig,
    options: RunOptions,
}

impl Engine {
    /// Load and validate the configuration at `path`.
    ///
    /// A missing file is reported as such; every other failure is an
    /// [`EngineError::InitialLoad`].
    pub async fn load(path: impl AsRef<Path>, options: RunOptions) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let source = FlowlineConfig::read(path).await?;
        let config = FlowlineConfig::from_source(&source).map_err(EngineError::InitialLoad)?;
        info!(
            config = %path.display(),
            components = config.component_count(),
            "configuration loaded"
        );
        Ok(Self::from_config(config, options))
    }

    /// Wrap an already validated configuration.
    pub fn from_config(config: FlowlineConfig, options: RunOptions) -> Self {
        Self { config, options }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &FlowlineConfig {
        &self.config
    }

    /// The runtime options.
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run until `cancel` fires or a component fails.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), EngineError> {
        m::describe_all();

        let storage = &self.options.storage_path;
        tokio::fs::create_dir_all(storage)
            .await
            .map_err(|source| EngineError::Storage {
                path: storage.display().to_string(),
                source,
            })?;

        let status = StatusServer::bind(&self.options.listen_addr).await?;
        let self_addr = status.local_addr().to_string();
        let components = self.build_components(status, &self_addr);

        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!(m::ENGINE_COMPONENTS_REGISTERED).set(self.config.component_count() as f64);
        metrics::gauge!(m::ENGINE_BUILD_INFO, m::LABEL_VERSION => crate::VERSION).set(1.0);

        let children = cancel.child_token();
        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();
        for component in components {
            let id = component.id().to_owned();
            let handle = tasks.spawn(component.run_boxed(children.clone()));
            names.insert(handle.id(), id);
        }
        info!(
            listen_addr = %self_addr,
            components = names.len(),
            "engine running"
        );

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                info!("engine shutdown requested");
                Ok(())
            }
            Some(joined) = tasks.join_next_with_id() => {
                let (task_id, result) = match joined {
                    Ok((task_id, result)) => (task_id, result.map_err(|e| e.to_string())),
                    Err(join_err) => (join_err.id(), Err(join_err.to_string())),
                };
                let component_id = names.get(&task_id).cloned().unwrap_or_default();
                let reason = match result {
                    Ok(()) => "exited before shutdown".to_owned(),
                    Err(reason) => reason,
                };
                error!(component_id = %component_id, reason = %reason, "component stopped unexpectedly");
                Err(EngineError::Component { component_id, reason })
            }
        };

        children.cancel();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((task_id, Err(e))) => {
                    let component_id = names.get(&task_id).map(String::as_str).unwrap_or_default();
                    warn!(component_id, error = %e, "component failed during shutdown");
                }
                Err(join_err) => {
                    let component_id = names.get(&join_err.id()).map(String::as_str).unwrap_or_default();
                    warn!(component_id, error = %join_err, "component task aborted during shutdown");
                }
            }
        }

        info!("engine stopped");
        outcome
    }

    fn build_components(&self, status: StatusServer, self_addr: &str) -> Vec<Box<dyn DynComponent>> {
        let wal_root = self.options.storage_path.join(WAL_DIR);
        let mut components: Vec<Box<dyn DynComponent>> = vec![Box::new(status)];

        let mut writers: HashMap<&str, BatchSender> = HashMap::new();
        for rw in &self.config.remote_write {
            let (component, tx) = RemoteWriteComponent::new(rw, &wal_root);
            writers.insert(rw.name.as_str(), tx);
            components.push(Box::new(component));
        }

        for sc in &self.config.scrape {
            let receivers = sc
                .forward_to
                .iter()
                .filter_map(|name| writers.get(name.as_str()).cloned())
                .collect();
            components.push(Box::new(ScrapeComponent::new(sc, self_addr, receivers)));
        }

        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_status_plus_configured_components() {
        let config = FlowlineConfig::from_source(
            r#"
[[scrape]]
name = "agent_self"
targets = ["self"]
forward_to = ["default"]

[[remote_write]]
name = "default"
endpoint = "127.0.0.1:1"
"#,
        )
        .unwrap();
        let engine = Engine::from_config(config, RunOptions::default());

        let status = StatusServer::bind("127.0.0.1:0").await.unwrap();
        let ids: Vec<String> = engine
            .build_components(status, "127.0.0.1:0")
            .iter()
            .map(|c| c.id().to_owned())
            .collect();

        assert_eq!(
            ids,
            [
                "server.http",
                "prometheus.remote_write.default",
                "prometheus.scrape.agent_self"
            ]
        );
    }

    #[test]
    fn default_options_point_at_local_state() {
        let options = RunOptions::default();
        assert_eq!(options.listen_addr, "127.0.0.1:12345");
        assert_eq!(options.storage_path, PathBuf::from("data-flowline"));
    }
}
