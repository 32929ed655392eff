//! Metric name constants and description registration.
//!
//! Components call `metrics::counter!()`, `metrics::gauge!()` and
//! `metrics::histogram!()` with these names; the recorder behind them is the
//! process-wide default [`TelemetryRegistry`](crate::telemetry::TelemetryRegistry).
//!
//! # Naming convention
//!
//! - prefix: `flowline_`
//! - subsystem: `prometheus_`, `wal_`, `remote_write_`, `server_`, `engine_`
//! - suffix: `_total` (counter), `_seconds` (histogram), none (gauge)
//!
//! ```ignore
//! metrics::counter!(
//!     flowline_core::metrics::PROMETHEUS_FORWARDED_SAMPLES_TOTAL,
//!     flowline_core::metrics::LABEL_COMPONENT_ID => "prometheus.scrape.agent_self",
//! )
//! .increment(42);
//! ```

// ─── label keys ─────────────────────────────────────────────────────

/// Component identifier label (`prometheus.scrape.<name>`, ...)
pub const LABEL_COMPONENT_ID: &str = "component_id";

/// HTTP path label on the status server
pub const LABEL_PATH: &str = "path";

/// Engine version label on the build info gauge
pub const LABEL_VERSION: &str = "version";

// ─── scrape ─────────────────────────────────────────────────────────

/// Number of targets a scrape component is responsible for (gauge)
pub const PROMETHEUS_SCRAPE_TARGETS_GAUGE: &str = "flowline_prometheus_scrape_targets_gauge";

/// Time to fan a scraped batch out to every receiver (histogram, seconds)
pub const PROMETHEUS_FANOUT_LATENCY: &str = "flowline_prometheus_fanout_latency";

/// Samples handed to receivers (counter)
pub const PROMETHEUS_FORWARDED_SAMPLES_TOTAL: &str = "flowline_prometheus_forwarded_samples_total";

// ─── WAL ────────────────────────────────────────────────────────────

/// Samples appended to a remote-write WAL (counter)
pub const WAL_SAMPLES_APPENDED_TOTAL: &str = "flowline_wal_samples_appended_total";

/// Distinct series seen by a WAL (gauge)
pub const WAL_STORAGE_ACTIVE_SERIES: &str = "flowline_wal_storage_active_series";

// ─── remote write ───────────────────────────────────────────────────

/// Samples delivered to the endpoint (counter)
pub const REMOTE_WRITE_SENT_SAMPLES_TOTAL: &str = "flowline_remote_write_sent_samples_total";

/// Write requests that could not be delivered (counter)
pub const REMOTE_WRITE_FAILED_REQUESTS_TOTAL: &str = "flowline_remote_write_failed_requests_total";

/// Time to deliver one write request (histogram, seconds)
pub const REMOTE_WRITE_SEND_DURATION_SECONDS: &str = "flowline_remote_write_send_duration_seconds";

// ─── status server / engine ─────────────────────────────────────────

/// Requests served by the status surface (counter, label: path)
pub const SERVER_HTTP_REQUESTS_TOTAL: &str = "flowline_server_http_requests_total";

/// Components started by the engine (gauge)
pub const ENGINE_COMPONENTS_REGISTERED: &str = "flowline_engine_components_registered";

/// Build information (gauge, always 1, label: version)
pub const ENGINE_BUILD_INFO: &str = "flowline_engine_build_info";

/// Register HELP text for every flowline metric on the current recorder.
///
/// Descriptions live on the recorder, so call this again after swapping the
/// default registry.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_gauge!(
        PROMETHEUS_SCRAPE_TARGETS_GAUGE,
        "Number of targets handled by a scrape component"
    );
    describe_histogram!(
        PROMETHEUS_FANOUT_LATENCY,
        "Time to forward one scraped batch to all receivers in seconds"
    );
    describe_counter!(
        PROMETHEUS_FORWARDED_SAMPLES_TOTAL,
        "Total number of samples forwarded to receivers"
    );
    describe_counter!(
        WAL_SAMPLES_APPENDED_TOTAL,
        "Total number of samples appended to the write-ahead log"
    );
    describe_gauge!(
        WAL_STORAGE_ACTIVE_SERIES,
        "Number of distinct series tracked by the write-ahead log"
    );
    describe_counter!(
        REMOTE_WRITE_SENT_SAMPLES_TOTAL,
        "Total number of samples delivered to the remote endpoint"
    );
    describe_counter!(
        REMOTE_WRITE_FAILED_REQUESTS_TOTAL,
        "Total number of write requests that failed to deliver"
    );
    describe_histogram!(
        REMOTE_WRITE_SEND_DURATION_SECONDS,
        "Time to deliver one write request in seconds"
    );
    describe_counter!(
        SERVER_HTTP_REQUESTS_TOTAL,
        "Total number of requests served by the status surface"
    );
    describe_gauge!(
        ENGINE_COMPONENTS_REGISTERED,
        "Number of pipeline components started by the engine"
    );
    describe_gauge!(ENGINE_BUILD_INFO, "Build information (always 1)");
}
