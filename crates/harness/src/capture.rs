//! Telemetry capture sink.
//!
//! A loopback TCP endpoint the engine's remote-write component delivers to.
//! Each line is one JSON [`WriteRequest`]. The sink keeps the latest sample
//! of every series and a count of accepted writes; predicates query it while
//! the engine keeps writing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use flowline_core::types::{Sample, WriteRequest};

use crate::error::HarnessError;

#[derive(Debug, Default)]
struct Buffer {
    writes: usize,
    seq: u64,
    /// series key -> (arrival sequence, latest sample)
    latest: HashMap<String, (u64, Sample)>,
}

impl Buffer {
    fn record(&mut self, request: WriteRequest) {
        self.writes += 1;
        for sample in request.samples {
            self.seq += 1;
            self.latest.insert(sample.series_key(), (self.seq, sample));
        }
    }
}

/// In-process write endpoint.
#[derive(Debug)]
pub struct CaptureSink {
    addr: SocketAddr,
    buffer: Arc<Mutex<Buffer>>,
    cancel: CancellationToken,
}

impl CaptureSink {
    /// Bind `127.0.0.1:0` and start accepting writes.
    pub async fn start() -> Result<Self, HarnessError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let buffer = Arc::new(Mutex::new(Buffer::default()));
        let cancel = CancellationToken::new();

        tokio::spawn(accept_loop(listener, Arc::clone(&buffer), cancel.clone()));
        debug!(addr = %addr, "capture sink listening");

        Ok(Self {
            addr,
            buffer,
            cancel,
        })
    }

    /// Address to configure as the engine's write endpoint.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of write requests received so far.
    pub fn writes_count(&self) -> usize {
        self.lock().writes
    }

    /// Number of distinct series received so far.
    pub fn series_count(&self) -> usize {
        self.lock().latest.len()
    }

    /// Value of the most recent sample named `name` whose labels include
    /// every `(key, value)` pair in `filters`.
    ///
    /// Returns `0.0` when nothing matches, so numeric bounds fail rather than
    /// pass vacuously.
    pub fn find_last_sample_matching(&self, name: &str, filters: &[(&str, &str)]) -> f64 {
        self.lock()
            .latest
            .values()
            .filter(|(_, sample)| sample.matches(name, filters))
            .max_by_key(|(seq, sample)| (sample.timestamp_ms, *seq))
            .map_or(0.0, |(_, sample)| sample.value)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CaptureSink {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn accept_loop(listener: TcpListener, buffer: Arc<Mutex<Buffer>>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "capture sink accepted writer");
                    tokio::spawn(read_writes(stream, Arc::clone(&buffer), cancel.clone()));
                }
                Err(e) => warn!(error = %e, "capture sink accept failed"),
            },
            _ = cancel.cancelled() => break,
        }
    }
}

async fn read_writes(stream: TcpStream, buffer: Arc<Mutex<Buffer>>, cancel: CancellationToken) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = cancel.cancelled() => return,
        };
        match line {
            Ok(Some(line)) => match serde_json::from_str::<WriteRequest>(&line) {
                Ok(request) => buffer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record(request),
                Err(e) => warn!(error = %e, "capture sink dropped malformed write"),
            },
            Ok(None) => return,
            Err(e) => {
                debug!(error = %e, "capture sink connection closed");
                return;
            }
        }
    }
}
