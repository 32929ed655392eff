//! Engine error types.
//!
//! [`EngineError`] is the terminal error an engine run reports. Load failures
//! keep the exact wording callers match on: a missing file renders as
//! `"<path>: no such file or directory"`, everything else that stops the
//! configuration from loading renders as
//! `"could not perform the initial load successfully: <reason>"`.

use flowline_core::error::{ConfigError, FlowlineError};

/// Engine domain error.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The configuration file could not be read.
    #[error(transparent)]
    Config(ConfigError),

    /// The configuration was read but could not be turned into a pipeline.
    #[error("could not perform the initial load successfully: {0}")]
    InitialLoad(ConfigError),

    /// The status surface could not bind its listen address.
    #[error("failed to bind status server on {addr}: {source}")]
    Bind {
        /// Requested listen address
        addr: String,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// The storage directory or a WAL file is unusable.
    #[error("storage error: {path}: {source}")]
    Storage {
        /// Offending path
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A scrape of one target failed.
    #[error("scrape error: {target}: {reason}")]
    Scrape {
        /// Target address
        target: String,
        /// Failure reason
        reason: String,
    },

    /// A text exposition payload could not be parsed.
    #[error("exposition parse error at line {line}: {reason}")]
    Exposition {
        /// 1-based line number
        line: usize,
        /// Failure reason
        reason: String,
    },

    /// A component stopped on its own or panicked.
    #[error("component {component_id} failed: {reason}")]
    Component {
        /// Component identifier
        component_id: String,
        /// Failure reason
        reason: String,
    },

    /// Write request encoding failed.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FlowlineError> for EngineError {
    fn from(err: FlowlineError) -> Self {
        match err {
            FlowlineError::Config(e) => EngineError::Config(e),
            FlowlineError::Io(e) => EngineError::Io(e),
            FlowlineError::Telemetry(e) => EngineError::Component {
                component_id: "telemetry".to_owned(),
                reason: e.to_string(),
            },
        }
    }
}
