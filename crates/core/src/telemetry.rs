//! Process-wide telemetry registry.
//!
//! The `metrics` crate allows exactly one global recorder per process. Flowline
//! installs a thin [`DefaultRecorder`] in that slot which forwards every call to
//! the current default [`TelemetryRegistry`]. The registry itself can be
//! swapped at runtime ([`swap_default`]), which is how tests give each engine
//! run a fresh registration and collection target.
//!
//! A registry pairs the two targets:
//! - registration: the Prometheus recorder the `metrics` macros reach
//! - collection: the Prometheus handle the status surface renders

use std::sync::{Arc, LazyLock, OnceLock, PoisonError, RwLock};

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::error::TelemetryError;

static DEFAULT_REGISTRY: LazyLock<RwLock<Arc<TelemetryRegistry>>> =
    LazyLock::new(|| RwLock::new(TelemetryRegistry::new()));

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// A registration target plus the matching collection target.
pub struct TelemetryRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl TelemetryRegistry {
    /// Create an empty registry.
    pub fn new() -> Arc<Self> {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        Arc::new(Self { recorder, handle })
    }

    /// Render every metric in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// The collection handle.
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }
}

impl std::fmt::Debug for TelemetryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryRegistry").finish_non_exhaustive()
    }
}

/// Install [`DefaultRecorder`] as the `metrics` global recorder.
///
/// Idempotent. Fails only if some other recorder claimed the slot first.
pub fn install() -> Result<(), TelemetryError> {
    let installed = *INSTALLED.get_or_init(|| {
        let ok = metrics::set_global_recorder(DefaultRecorder).is_ok();
        if ok {
            tracing::debug!("default telemetry recorder installed");
        }
        ok
    });
    if installed {
        Ok(())
    } else {
        Err(TelemetryError::ForeignRecorder)
    }
}

/// The current default registry.
pub fn default_registry() -> Arc<TelemetryRegistry> {
    DEFAULT_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replace the default registry, returning the previous one.
pub fn swap_default(registry: Arc<TelemetryRegistry>) -> Arc<TelemetryRegistry> {
    let mut slot = DEFAULT_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *slot, registry)
}

/// Global recorder that forwards to whatever registry is currently the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRecorder;

impl Recorder for DefaultRecorder {
    fn describe_counter(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        default_registry()
            .recorder
            .describe_counter(key, unit, description);
    }

    fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        default_registry()
            .recorder
            .describe_gauge(key, unit, description);
    }

    fn describe_histogram(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        default_registry()
            .recorder
            .describe_histogram(key, unit, description);
    }

    fn register_counter(&self, key: &Key, metadata: &Metadata<'_>) -> Counter {
        default_registry().recorder.register_counter(key, metadata)
    }

    fn register_gauge(&self, key: &Key, metadata: &Metadata<'_>) -> Gauge {
        default_registry().recorder.register_gauge(key, metadata)
    }

    fn register_histogram(&self, key: &Key, metadata: &Metadata<'_>) -> Histogram {
        default_registry().recorder.register_histogram(key, metadata)
    }
}
