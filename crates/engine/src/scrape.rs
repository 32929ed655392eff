//! Scrape component: periodically pulls targets and fans samples out.
//!
//! Every scraped sample gets `job` and `instance` labels. Each target also
//! produces synthetic `up`, `scrape_duration_seconds` and
//! `scrape_samples_scraped` series so a failing target is still visible
//! downstream.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use flowline_core::config::{SELF_TARGET, ScrapeConfig};
use flowline_core::metrics as m;
use flowline_core::types::Sample;

use crate::component::{Component, SCRAPE_ID_PREFIX, component_id};
use crate::error::EngineError;
use crate::exposition;
use crate::status::{EXPOSITION_CONTENT_TYPE, METRICS_PATH};

/// Sender half of a receiver's batch channel.
pub type BatchSender = mpsc::Sender<Vec<Sample>>;

/// Scrape component.
pub struct ScrapeComponent {
    id: String,
    job: String,
    targets: Vec<String>,
    interval: Duration,
    timeout: Duration,
    receivers: Vec<BatchSender>,
    client: reqwest::Client,
}

impl ScrapeComponent {
    /// Build from config. `"self"` targets resolve to `self_addr`.
    pub fn new(config: &ScrapeConfig, self_addr: &str, receivers: Vec<BatchSender>) -> Self {
        let targets = config
            .targets
            .iter()
            .map(|t| {
                if t == SELF_TARGET {
                    self_addr.to_owned()
                } else {
                    t.clone()
                }
            })
            .collect();

        Self {
            id: component_id(SCRAPE_ID_PREFIX, &config.name),
            job: config.name.clone(),
            targets,
            interval: Duration::from_millis(config.interval_ms),
            timeout: Duration::from_millis(config.timeout_ms),
            receivers,
            client: reqwest::Client::new(),
        }
    }

    /// Resolved target addresses.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Scrape one target, never failing: errors become `up == 0`.
    async fn scrape_target(&self, target: &str) -> Vec<Sample> {
        let started = Instant::now();
        let timestamp_ms = chrono::Utc::now().timestamp_millis();

        let scraped = fetch_exposition(&self.client, target, self.timeout)
            .await
            .and_then(|body| exposition::parse(&body, timestamp_ms));

        let (mut samples, up) = match scraped {
            Ok(samples) => (samples, 1.0),
            Err(e) => {
                warn!(component_id = %self.id, target, error = %e, "scrape failed");
                (Vec::new(), 0.0)
            }
        };

        #[allow(clippy::cast_precision_loss)]
        let scraped_count = samples.len() as f64;
        let duration = started.elapsed().as_secs_f64();
        samples.push(Sample::new("up", Vec::new(), up, timestamp_ms));
        samples.push(Sample::new(
            "scrape_duration_seconds",
            Vec::new(),
            duration,
            timestamp_ms,
        ));
        samples.push(Sample::new(
            "scrape_samples_scraped",
            Vec::new(),
            scraped_count,
            timestamp_ms,
        ));

        for sample in &mut samples {
            sample.set_label("job", &self.job);
            sample.set_label("instance", target);
        }
        samples
    }

    /// Hand a batch to every receiver. Returns false once cancelled.
    async fn fan_out(&self, batch: Vec<Sample>, cancel: &CancellationToken) -> bool {
        let started = Instant::now();
        let count = batch.len() as u64;

        for receiver in &self.receivers {
            tokio::select! {
                sent = receiver.send(batch.clone()) => {
                    if sent.is_err() {
                        debug!(component_id = %self.id, "receiver closed, batch dropped");
                    }
                }
                _ = cancel.cancelled() => return false,
            }
        }

        metrics::histogram!(m::PROMETHEUS_FANOUT_LATENCY, m::LABEL_COMPONENT_ID => self.id.clone())
            .record(started.elapsed().as_secs_f64());
        metrics::counter!(m::PROMETHEUS_FORWARDED_SAMPLES_TOTAL, m::LABEL_COMPONENT_ID => self.id.clone())
            .increment(count);
        true
    }
}

/// `GET http://<target>/metrics`, returning the body of a success response.
pub async fn fetch_exposition(
    client: &reqwest::Client,
    target: &str,
    timeout: Duration,
) -> Result<String, EngineError> {
    let scrape_err = |reason: String| EngineError::Scrape {
        target: target.to_owned(),
        reason,
    };
    let describe = |e: reqwest::Error| {
        if e.is_timeout() {
            format!("timed out after {timeout:?}")
        } else {
            e.to_string()
        }
    };

    let response = client
        .get(format!("http://{target}{METRICS_PATH}"))
        .header(reqwest::header::ACCEPT, EXPOSITION_CONTENT_TYPE)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| scrape_err(describe(e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(scrape_err(format!("unexpected status {status}")));
    }
    response.text().await.map_err(|e| scrape_err(describe(e)))
}

impl Component for ScrapeComponent {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(
        self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), EngineError>> + Send + 'static {
        async move {
            info!(
                component_id = %self.id,
                targets = ?self.targets,
                interval_ms = self.interval.as_millis() as u64,
                "scrape component started"
            );

            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            'outer: loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = cancel.cancelled() => break,
                }

                #[allow(clippy::cast_precision_loss)]
                metrics::gauge!(m::PROMETHEUS_SCRAPE_TARGETS_GAUGE, m::LABEL_COMPONENT_ID => self.id.clone())
                    .set(self.targets.len() as f64);

                for target in &self.targets {
                    let batch = tokio::select! {
                        batch = self.scrape_target(target) => batch,
                        _ = cancel.cancelled() => break 'outer,
                    };
                    if !self.fan_out(batch, &cancel).await {
                        break 'outer;
                    }
                }
            }

            info!(component_id = %self.id, "scrape component stopped");
            Ok(())
        }
    }
}
