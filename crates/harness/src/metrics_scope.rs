//! Scoped swap of the process-wide telemetry registry.
//!
//! [`MetricsScope::acquire`] points the default registration target (the
//! recorder behind the `metrics` macros) and collection target (the handle
//! the engine's `/metrics` surface renders) at a fresh registry. Dropping the
//! scope puts the previous registry back, on every exit path including
//! panics.
//!
//! The default registry is process-global: scopes must not overlap, so tests
//! that acquire one run under `#[serial]`.

use std::sync::Arc;

use tracing::debug;

use flowline_core::telemetry::{self, TelemetryRegistry};

use crate::error::HarnessError;

/// Guard owning the test-local registry.
#[derive(Debug)]
pub struct MetricsScope {
    current: Arc<TelemetryRegistry>,
    previous: Option<Arc<TelemetryRegistry>>,
}

impl MetricsScope {
    /// Swap in a fresh registry.
    pub fn acquire() -> Result<Self, HarnessError> {
        Self::acquire_with(TelemetryRegistry::new())
    }

    /// Swap in `registry`.
    pub fn acquire_with(registry: Arc<TelemetryRegistry>) -> Result<Self, HarnessError> {
        telemetry::install().map_err(|e| HarnessError::Setup(e.to_string()))?;
        let previous = telemetry::swap_default(Arc::clone(&registry));
        flowline_core::metrics::describe_all();
        debug!("test-local telemetry registry acquired");
        Ok(Self {
            current: registry,
            previous: Some(previous),
        })
    }

    /// The test-local registry.
    pub fn registry(&self) -> &Arc<TelemetryRegistry> {
        &self.current
    }
}

impl Drop for MetricsScope {
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        // A newer scope owns the default now; it restores its own predecessor.
        if !Arc::ptr_eq(&telemetry::default_registry(), &self.current) {
            debug!("telemetry registry replaced by a newer scope, not restoring");
            return;
        }
        telemetry::swap_default(previous);
        debug!("previous telemetry registry restored");
    }
}
