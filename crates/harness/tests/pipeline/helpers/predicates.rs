//! Predicates shared across scenarios.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use flowline_harness::{Collect, RuntimeHandle};

const SCRAPE_COMPONENT: &str = "prometheus.scrape.agent_self";
const WRITE_COMPONENT: &str = "prometheus.remote_write.default";

/// Telemetry the self-scrape pipeline must eventually report through the
/// capture sink.
pub fn self_scrape_healthy(c: &mut Collect, rt: &RuntimeHandle) {
    c.not_empty("write requests", rt.writes_count());
    c.equal(
        "scrape targets",
        rt.find_last_sample_matching(
            "flowline_prometheus_scrape_targets_gauge",
            &[("component_id", SCRAPE_COMPONENT)],
        ),
        1.0,
    );
    c.greater_or_equal(
        "fanout latency observations",
        rt.find_last_sample_matching(
            "flowline_prometheus_fanout_latency_count",
            &[("component_id", SCRAPE_COMPONENT)],
        ),
        1.0,
    );
    c.greater(
        "forwarded samples",
        rt.find_last_sample_matching(
            "flowline_prometheus_forwarded_samples_total",
            &[("component_id", SCRAPE_COMPONENT)],
        ),
        1000.0,
    );
    c.greater(
        "WAL samples appended",
        rt.find_last_sample_matching(
            "flowline_wal_samples_appended_total",
            &[("component_id", WRITE_COMPONENT)],
        ),
        1000.0,
    );
    // Scaled to this engine's self-telemetry, a few dozen series including
    // summary quantiles and the synthetic scrape series.
    c.greater(
        "WAL active series",
        rt.find_last_sample_matching(
            "flowline_wal_storage_active_series",
            &[("component_id", WRITE_COMPONENT)],
        ),
        20.0,
    );
}

/// A predicate that never passes and names the round it failed in.
///
/// The returned counter holds the number of rounds evaluated.
#[allow(dead_code)]
pub fn never_converges() -> (
    impl Fn(&mut Collect, &RuntimeHandle) + Send + Sync + 'static,
    Arc<AtomicUsize>,
) {
    let rounds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&rounds);
    let predicate = move |c: &mut Collect, _: &RuntimeHandle| {
        let round = counter.fetch_add(1, Ordering::SeqCst) + 1;
        c.fail(format!("round {round}"));
    };
    (predicate, rounds)
}
