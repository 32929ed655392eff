//! Flowline engine: a small metrics pipeline.
//!
//! The engine self-scrapes its own status surface (and any other configured
//! targets), appends the samples to a per-writer WAL and forwards them to a
//! write endpoint. Component telemetry is exposed on `GET /metrics`.
//!
//! ```text
//! ScrapeComponent ──mpsc──▶ RemoteWriteComponent ──tcp──▶ endpoint
//!        ▲                          │
//!        └──── StatusServer ◀── metrics registry
//! ```

pub mod component;
pub mod engine;
pub mod error;
pub mod exposition;
pub mod remote_write;
pub mod scrape;
pub mod status;
pub mod wal;

/// Engine version, reported on the build info gauge.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// --- re-exports ---

pub use component::{Component, DynComponent};
pub use engine::{Engine, RunOptions};
pub use error::EngineError;
