//! Flowline core: shared configuration, errors, metric names, the process-wide
//! telemetry registry and the sample types exchanged between components.

pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;
pub mod types;

// --- re-exports ---

pub use config::{FlowlineConfig, GeneralConfig, RemoteWriteConfig, ScrapeConfig};
pub use error::{ConfigError, FlowlineError, TelemetryError};
pub use telemetry::TelemetryRegistry;
pub use types::{Sample, WriteRequest};
