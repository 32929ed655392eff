//! Write-ahead log backing a remote-write component.
//!
//! Samples are appended as JSON lines to a single segment file under the
//! component's storage directory before any delivery is attempted. The WAL
//! also tracks the set of distinct series it has seen.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use flowline_core::types::Sample;

use crate::error::EngineError;

/// Name of the active segment file.
pub const SEGMENT_FILE: &str = "00000000.jsonl";

/// Append-only sample log.
pub struct Wal {
    dir: PathBuf,
    writer: BufWriter<File>,
    series: HashSet<String>,
    appended: u64,
}

impl Wal {
    /// Open (creating if needed) the WAL in `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| storage_err(&dir, source))?;

        let segment = dir.join(SEGMENT_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&segment)
            .await
            .map_err(|source| storage_err(&segment, source))?;
        debug!(segment = %segment.display(), "wal segment opened");

        Ok(Self {
            dir,
            writer: BufWriter::new(file),
            series: HashSet::new(),
            appended: 0,
        })
    }

    /// Append a batch. Returns the number of samples written.
    pub async fn append(&mut self, samples: &[Sample]) -> Result<usize, EngineError> {
        let mut buf = Vec::new();
        for sample in samples {
            serde_json::to_writer(&mut buf, sample)?;
            buf.push(b'\n');
            self.series.insert(sample.series_key());
        }
        self.writer
            .write_all(&buf)
            .await
            .map_err(|source| storage_err(&self.dir, source))?;
        self.appended += samples.len() as u64;
        Ok(samples.len())
    }

    /// Flush buffered lines to the segment file.
    pub async fn flush(&mut self) -> Result<(), EngineError> {
        self.writer
            .flush()
            .await
            .map_err(|source| storage_err(&self.dir, source))
    }

    /// Number of distinct series appended since open.
    pub fn active_series(&self) -> usize {
        self.series.len()
    }

    /// Number of samples appended since open.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Directory holding the segment.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn storage_err(path: &Path, source: std::io::Error) -> EngineError {
    EngineError::Storage {
        path: path.display().to_string(),
        source,
    }
}
