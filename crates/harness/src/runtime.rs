//! Runtime handle: everything a running engine exposes to a test.
//!
//! The handle owns the engine's ephemeral listen address, its storage
//! directory and the capture sink it writes to. Configurations reach the
//! sink through `${PIPELINE_TESTS_WRITE_ENDPOINT}`, which the handle exports
//! for its lifetime.

use std::net::SocketAddr;
use std::path::Path;

use tempfile::TempDir;
use tracing::debug;

use crate::capture::CaptureSink;
use crate::error::HarnessError;

/// Environment variable carrying the capture sink address.
pub const WRITE_ENDPOINT_ENV: &str = "PIPELINE_TESTS_WRITE_ENDPOINT";

/// Read-only view of a live engine for predicates.
#[derive(Debug)]
pub struct RuntimeHandle {
    listen_addr: SocketAddr,
    sink: CaptureSink,
    storage: TempDir,
}

impl RuntimeHandle {
    /// Start the sink, pick a free port and create the storage directory.
    pub async fn start() -> Result<Self, HarnessError> {
        let sink = CaptureSink::start().await?;
        let listen_addr = reserve_listen_addr()?;
        let storage = tempfile::Builder::new()
            .prefix("flowline-pipeline-")
            .tempdir()?;

        // SAFETY: pipeline tests run serially; no other thread reads or
        // writes the environment while a handle is alive.
        unsafe { std::env::set_var(WRITE_ENDPOINT_ENV, sink.addr().to_string()) };

        debug!(
            listen_addr = %listen_addr,
            sink = %sink.addr(),
            storage = %storage.path().display(),
            "runtime handle ready"
        );
        Ok(Self {
            listen_addr,
            sink,
            storage,
        })
    }

    /// Engine status surface address.
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Engine storage directory.
    pub fn storage_path(&self) -> &Path {
        self.storage.path()
    }

    /// The capture sink.
    pub fn sink(&self) -> &CaptureSink {
        &self.sink
    }

    /// Write requests received by the sink.
    pub fn writes_count(&self) -> usize {
        self.sink.writes_count()
    }

    /// See [`CaptureSink::find_last_sample_matching`].
    pub fn find_last_sample_matching(&self, name: &str, filters: &[(&str, &str)]) -> f64 {
        self.sink.find_last_sample_matching(name, filters)
    }
}

impl Drop for RuntimeHandle {
    fn drop(&mut self) {
        // A later handle may have exported its own sink already.
        if std::env::var(WRITE_ENDPOINT_ENV).ok() != Some(self.sink.addr().to_string()) {
            return;
        }
        // SAFETY: see `start`.
        unsafe { std::env::remove_var(WRITE_ENDPOINT_ENV) };
    }
}

/// Pick a free loopback port by binding `:0` and releasing it.
fn reserve_listen_addr() -> std::io::Result<SocketAddr> {
    std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn exports_sink_address_while_alive() {
        let handle = RuntimeHandle::start().await.unwrap();
        assert_eq!(
            std::env::var(WRITE_ENDPOINT_ENV).unwrap(),
            handle.sink().addr().to_string()
        );
        assert!(handle.storage_path().is_dir());
        assert!(handle.listen_addr().ip().is_loopback());
        assert_ne!(handle.listen_addr().port(), 0);

        let storage = handle.storage_path().to_path_buf();
        drop(handle);
        assert!(std::env::var(WRITE_ENDPOINT_ENV).is_err());
        assert!(!storage.exists(), "storage is removed with the handle");
    }

    #[tokio::test]
    #[serial]
    async fn older_handle_leaves_newer_endpoint_exported() {
        let older = RuntimeHandle::start().await.unwrap();
        let newer = RuntimeHandle::start().await.unwrap();

        drop(older);
        assert_eq!(
            std::env::var(WRITE_ENDPOINT_ENV).unwrap(),
            newer.sink().addr().to_string()
        );
        drop(newer);
        assert!(std::env::var(WRITE_ENDPOINT_ENV).is_err());
    }
}
