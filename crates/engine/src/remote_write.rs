//! Remote-write component: WAL append, then delivery to the endpoint.
//!
//! Every received batch is appended to the WAL first. Delivery writes one
//! newline-terminated JSON [`WriteRequest`] per batch over a persistent TCP
//! connection that is re-established after any failure. Failed deliveries are
//! counted and dropped; the WAL keeps the samples.

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use flowline_core::config::RemoteWriteConfig;
use flowline_core::metrics as m;
use flowline_core::types::{Sample, WriteRequest};

use crate::component::{Component, REMOTE_WRITE_ID_PREFIX, component_id};
use crate::error::EngineError;
use crate::scrape::BatchSender;
use crate::wal::Wal;

/// Capacity of the batch channel feeding a remote-write component.
pub const CHANNEL_CAPACITY: usize = 64;

/// Remote-write component.
pub struct RemoteWriteComponent {
    id: String,
    endpoint: String,
    send_timeout: Duration,
    wal_dir: std::path::PathBuf,
    rx: mpsc::Receiver<Vec<Sample>>,
}

impl RemoteWriteComponent {
    /// Build from config. The WAL lives in `<wal_root>/<name>`.
    ///
    /// Returns the component and the sender scrape components forward to.
    pub fn new(config: &RemoteWriteConfig, wal_root: &Path) -> (Self, BatchSender) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let component = Self {
            id: component_id(REMOTE_WRITE_ID_PREFIX, &config.name),
            endpoint: config.endpoint.clone(),
            send_timeout: Duration::from_millis(config.send_timeout_ms),
            wal_dir: wal_root.join(&config.name),
            rx,
        };
        (component, tx)
    }

    async fn handle_batch(
        &self,
        wal: &mut Wal,
        conn: &mut Option<TcpStream>,
        batch: Vec<Sample>,
    ) -> Result<(), EngineError> {
        let appended = wal.append(&batch).await?;
        metrics::counter!(m::WAL_SAMPLES_APPENDED_TOTAL, m::LABEL_COMPONENT_ID => self.id.clone())
            .increment(appended as u64);
        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!(m::WAL_STORAGE_ACTIVE_SERIES, m::LABEL_COMPONENT_ID => self.id.clone())
            .set(wal.active_series() as f64);

        let request = WriteRequest {
            component_id: self.id.clone(),
            samples: batch,
        };
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');

        let started = Instant::now();
        match self.deliver(conn, &line).await {
            Ok(()) => {
                metrics::counter!(m::REMOTE_WRITE_SENT_SAMPLES_TOTAL, m::LABEL_COMPONENT_ID => self.id.clone())
                    .increment(request.samples.len() as u64);
                metrics::histogram!(m::REMOTE_WRITE_SEND_DURATION_SECONDS, m::LABEL_COMPONENT_ID => self.id.clone())
                    .record(started.elapsed().as_secs_f64());
            }
            Err(e) => {
                *conn = None;
                metrics::counter!(m::REMOTE_WRITE_FAILED_REQUESTS_TOTAL, m::LABEL_COMPONENT_ID => self.id.clone())
                    .increment(1);
                warn!(component_id = %self.id, endpoint = %self.endpoint, error = %e, "write request failed");
            }
        }
        Ok(())
    }

    async fn deliver(&self, conn: &mut Option<TcpStream>, line: &[u8]) -> std::io::Result<()> {
        if conn.is_none() {
            let stream = timeout(self.send_timeout, TcpStream::connect(&self.endpoint))
                .await
                .map_err(|_| std::io::Error::from(std::io::ErrorKind::TimedOut))??;
            debug!(component_id = %self.id, endpoint = %self.endpoint, "connected to write endpoint");
            *conn = Some(stream);
        }

        let Some(stream) = conn.as_mut() else {
            return Err(std::io::Error::from(std::io::ErrorKind::NotConnected));
        };
        timeout(self.send_timeout, stream.write_all(line))
            .await
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::TimedOut))?
    }
}

impl Component for RemoteWriteComponent {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(
        mut self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), EngineError>> + Send + 'static {
        async move {
            let mut wal = Wal::open(&self.wal_dir).await?;
            let mut conn: Option<TcpStream> = None;
            info!(
                component_id = %self.id,
                endpoint = %self.endpoint,
                wal_dir = %wal.dir().display(),
                "remote_write component started"
            );

            loop {
                tokio::select! {
                    batch = self.rx.recv() => match batch {
                        Some(batch) => self.handle_batch(&mut wal, &mut conn, batch).await?,
                        None => {
                            // No scrape forwards here; idle until shutdown.
                            cancel.cancelled().await;
                            break;
                        }
                    },
                    _ = cancel.cancelled() => break,
                }
            }

            wal.flush().await?;
            info!(
                component_id = %self.id,
                appended = wal.appended(),
                "remote_write component stopped"
            );
            Ok(())
        }
    }
}
