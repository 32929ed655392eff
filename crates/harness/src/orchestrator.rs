//! Test case orchestration.
//!
//! # Flow
//!
//! 1. Acquire a [`MetricsScope`] (test-local telemetry registry)
//! 2. Start the [`RuntimeHandle`]: capture sink, listen port, storage
//! 3. Arm the deadline
//! 4. Launch the engine and start the poller
//! 5. Race deadline / convergence / engine exit
//! 6. Converged: shut down and verify; exited: verify; deadline: shut
//!    down, then fail
//! 7. Release everything (drop guards, in reverse order)
//!
//! The cancellation scope is dropped through a guard, so the engine and the
//! poller are cancelled on every exit path, including early returns. The
//! runtime handle and the metrics scope are released only once the engine
//! has exited; an engine that outlives the verdict keeps them through a
//! detached task.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::case::{AssertionFailure, TestCase};
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::launcher::{LaunchArgs, launch};
use crate::metrics_scope::MetricsScope;
use crate::poller::poll;
use crate::race::{Outcome, ShutdownResult, race, shutdown};
use crate::runtime::RuntimeHandle;
use crate::signal::{CompletionSignal, ExitError};
use crate::verify::verify_exit_error;

/// Starts the engine for one test case.
pub type LaunchFn =
    Arc<dyn Fn(&LaunchArgs, &CancellationToken) -> CompletionSignal<Option<ExitError>> + Send + Sync>;

/// Summary of a passing test case.
#[derive(Debug, Clone)]
pub struct TestReport {
    /// How the race was decided
    pub outcome: Outcome,
    /// Predicate rounds evaluated
    pub rounds: usize,
    /// Wall time from launch to verdict
    pub elapsed: Duration,
    /// Non-fatal diagnostics (e.g. a missed grace window)
    pub notes: Vec<String>,
}

/// Runs test cases with fixed timing.
#[derive(Clone)]
pub struct Orchestrator {
    config: HarnessConfig,
    launch: LaunchFn,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

impl Orchestrator {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            launch: Arc::new(launch),
        }
    }

    /// Orchestrator using [`HarnessConfig::from_env`].
    pub fn from_env() -> Result<Self, HarnessError> {
        Ok(Self::new(HarnessConfig::from_env()?))
    }

    /// Replace the in-process engine launcher.
    pub fn with_launcher<F>(mut self, launcher: F) -> Self
    where
        F: Fn(&LaunchArgs, &CancellationToken) -> CompletionSignal<Option<ExitError>>
            + Send
            + Sync
            + 'static,
    {
        self.launch = Arc::new(launcher);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run `case` inside a fresh metrics scope.
    pub async fn run(&self, case: &TestCase) -> Result<TestReport, HarnessError> {
        let metrics = Arc::new(MetricsScope::acquire()?);
        let span = info_span!("pipeline_test", config = %case.config_path().display());
        self.run_in_scope(&metrics, case).instrument(span).await
    }

    /// Run `case` inside a caller-owned metrics scope.
    ///
    /// The scope is kept alive until the engine exits, even past the return
    /// of this call.
    pub async fn run_in_scope(
        &self,
        metrics: &Arc<MetricsScope>,
        case: &TestCase,
    ) -> Result<TestReport, HarnessError> {
        let runtime = Arc::new(RuntimeHandle::start().await?);
        let scope = CancellationToken::new();
        let _cancel_on_exit = scope.clone().drop_guard();

        let deadline = tokio::time::sleep(self.config.deadline);
        tokio::pin!(deadline);
        let started = Instant::now();

        let launcher = (self.launch)(&LaunchArgs::new(case.config_path(), &runtime), &scope);
        let poller = poll(
            case.predicate().cloned(),
            Arc::clone(&runtime),
            self.config.poll_interval,
            scope.clone(),
        );
        let resources = Resources {
            launcher: launcher.clone(),
            runtime,
            metrics: Arc::clone(metrics),
        };

        let outcome = race(deadline.as_mut(), poller.done(), &launcher).await;

        let notes = match &outcome {
            Outcome::DeadlineExceeded => {
                let err = deadline_verdict(self.config.deadline, poller.last_failures());
                if let ShutdownResult::GraceExpired =
                    shutdown(&scope, &launcher, self.config.shutdown_grace).await
                {
                    resources.hold_until_exit();
                }
                return Err(err);
            }
            Outcome::ProcessExited(exit) => {
                info!(rounds = poller.rounds(), "engine exited before convergence");
                verify_exit_error(case.expected_error(), exit.as_ref())?;
                Vec::new()
            }
            Outcome::Converged => {
                info!(rounds = poller.rounds(), "assertions converged");
                let result = shutdown(&scope, &launcher, self.config.shutdown_grace).await;
                if let ShutdownResult::GraceExpired = result {
                    resources.hold_until_exit();
                }
                shutdown_verdict(&result, case, self.config.shutdown_grace)?
                    .into_iter()
                    .collect()
            }
        };

        Ok(TestReport {
            outcome,
            rounds: poller.rounds(),
            elapsed: started.elapsed(),
            notes,
        })
    }
}

/// Run `case` with environment-derived timing.
pub async fn run_test_case(case: &TestCase) -> Result<TestReport, HarnessError> {
    Orchestrator::from_env()?.run(case).await
}

/// The error for a race lost to the deadline.
///
/// A failing last round makes it an assertion timeout; with no failures on
/// record (no round ran yet) it is a plain harness deadline.
pub fn deadline_verdict(deadline: Duration, last_failures: Vec<AssertionFailure>) -> HarnessError {
    if last_failures.is_empty() {
        HarnessError::HarnessDeadline { deadline }
    } else {
        HarnessError::AssertionTimeout {
            deadline,
            failures: last_failures,
        }
    }
}

/// The verdict of a finished shutdown handshake.
///
/// `Ok(Some(note))` passes with a diagnostic: the grace window expired but
/// `case` does not require a clean shutdown.
pub fn shutdown_verdict(
    result: &ShutdownResult,
    case: &TestCase,
    grace: Duration,
) -> Result<Option<String>, HarnessError> {
    match result {
        ShutdownResult::Exited(exit) => {
            verify_exit_error(case.expected_error(), exit.as_ref())?;
            Ok(None)
        }
        ShutdownResult::GraceExpired if case.require_clean_shutdown() => {
            Err(HarnessError::ShutdownTimeout { grace })
        }
        ShutdownResult::GraceExpired => {
            let note =
                format!("engine did not shut down within {grace:?}; clean shutdown not required");
            warn!("{note}");
            Ok(Some(note))
        }
    }
}

/// What a running engine depends on.
struct Resources {
    launcher: CompletionSignal<Option<ExitError>>,
    runtime: Arc<RuntimeHandle>,
    metrics: Arc<MetricsScope>,
}

impl Resources {
    /// Keep storage, sink and telemetry scope alive until the engine exits.
    fn hold_until_exit(self) {
        debug!("engine still running, holding its resources until it exits");
        tokio::spawn(async move {
            self.launcher.wait().await;
            drop(self.runtime);
            drop(self.metrics);
            debug!("late engine exit, resources released");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tokio::sync::mpsc;

    use flowline_core::telemetry;

    fn timing(deadline: Duration, grace: Duration) -> HarnessConfig {
        HarnessConfig::default()
            .with_deadline(deadline)
            .with_poll_interval(Duration::from_millis(10))
            .with_shutdown_grace(grace)
    }

    fn case(clean: bool) -> TestCase {
        TestCase::builder("unused.toml")
            .require_clean_shutdown(clean)
            .build()
    }

    /// What a fake engine saw when it finally exited.
    #[derive(Debug)]
    struct LateExit {
        storage_present: bool,
        endpoint_exported: bool,
    }

    /// A launcher whose engine ignores cancellation for `linger`, then
    /// records a metric and reports what it could still reach.
    fn slow_engine(
        linger: Duration,
    ) -> (
        impl Fn(&LaunchArgs, &CancellationToken) -> CompletionSignal<Option<ExitError>> + Send + Sync + 'static,
        mpsc::UnboundedReceiver<LateExit>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let launcher = move |args: &LaunchArgs, scope: &CancellationToken| {
            let done = CompletionSignal::new();
            let signal = done.clone();
            let scope = scope.clone();
            let storage = args.storage_path.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                scope.cancelled().await;
                tokio::time::sleep(linger).await;
                metrics::counter!("flowline_late_engine_total").increment(1);
                let _ = tx.send(LateExit {
                    storage_present: storage.is_dir(),
                    endpoint_exported: std::env::var(crate::runtime::WRITE_ENDPOINT_ENV).is_ok(),
                });
                signal.resolve(None);
            });
            done
        };
        (launcher, rx)
    }

    #[test]
    fn deadline_without_failures_is_a_harness_deadline() {
        let err = deadline_verdict(Duration::from_secs(1), Vec::new());
        assert!(matches!(err, HarnessError::HarnessDeadline { .. }));
    }

    #[test]
    fn deadline_with_failures_keeps_them() {
        let err = deadline_verdict(Duration::from_secs(1), vec![AssertionFailure::new("round 3")]);
        match err {
            HarnessError::AssertionTimeout { failures, .. } => {
                assert_eq!(failures[0].message(), "round 3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn grace_expiry_is_fatal_when_clean_shutdown_required() {
        let err = shutdown_verdict(&ShutdownResult::GraceExpired, &case(true), Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, HarnessError::ShutdownTimeout { grace } if grace == Duration::from_secs(5)));
    }

    #[test]
    fn grace_expiry_is_a_note_otherwise() {
        let note = shutdown_verdict(&ShutdownResult::GraceExpired, &case(false), Duration::from_secs(5))
            .unwrap()
            .expect("a diagnostic note");
        assert!(note.contains("5s"), "{note}");
    }

    #[test]
    fn exited_engine_goes_through_verification() {
        let clean = shutdown_verdict(&ShutdownResult::Exited(None), &case(true), Duration::from_secs(5));
        assert!(matches!(clean, Ok(None)));

        let failed = ShutdownResult::Exited(Some(Arc::new(anyhow::anyhow!("boom"))));
        let err = shutdown_verdict(&failed, &case(true), Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, HarnessError::UnexpectedExitError { .. }));
    }

    #[tokio::test]
    #[serial]
    async fn slow_engine_with_clean_shutdown_required_fails() {
        // Given: an engine that outlives a 20ms grace window
        let (launcher, mut exits) = slow_engine(Duration::from_millis(200));
        let orchestrator = Orchestrator::new(timing(Duration::from_secs(10), Duration::from_millis(20)))
            .with_launcher(launcher);

        // When
        let err = orchestrator.run(&case(true)).await.unwrap_err();

        // Then
        assert!(matches!(err, HarnessError::ShutdownTimeout { .. }), "{err}");
        exits.recv().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn slow_engine_without_clean_shutdown_passes_with_note() {
        let (launcher, mut exits) = slow_engine(Duration::from_millis(200));
        let orchestrator = Orchestrator::new(timing(Duration::from_secs(10), Duration::from_millis(20)))
            .with_launcher(launcher);

        let report = orchestrator.run(&case(false)).await.unwrap();

        assert!(report.outcome.is_converged());
        assert_eq!(report.notes.len(), 1);
        assert!(report.notes[0].contains("clean shutdown not required"));
        let exit = exits.recv().await.unwrap();
        assert!(exit.storage_present, "storage outlives the verdict");
    }

    #[tokio::test]
    #[serial]
    async fn late_engine_keeps_resources_after_shutdown_timeout() {
        // Given: an engine that needs 200ms past cancellation, grace 20ms
        let before = telemetry::default_registry();
        let (launcher, mut exits) = slow_engine(Duration::from_millis(200));
        let orchestrator = Orchestrator::new(timing(Duration::from_secs(10), Duration::from_millis(20)))
            .with_launcher(launcher);

        // When: the verdict is returned before the engine exits
        let err = orchestrator.run(&case(true)).await.unwrap_err();
        assert!(matches!(err, HarnessError::ShutdownTimeout { .. }), "{err}");

        // Then: the engine still had its storage and endpoint when it exited
        let exit = tokio::time::timeout(Duration::from_secs(5), exits.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(exit.storage_present);
        assert!(exit.endpoint_exported);

        // and its late metric stayed out of the global registry
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(Arc::ptr_eq(&telemetry::default_registry(), &before));
        assert!(!before.render().contains("flowline_late_engine_total"));
    }

    #[tokio::test]
    #[serial]
    async fn late_engine_keeps_resources_after_deadline() {
        // Given: a predicate that never passes and a slow-stopping engine
        let (launcher, mut exits) = slow_engine(Duration::from_millis(100));
        let orchestrator = Orchestrator::new(timing(Duration::from_millis(100), Duration::from_secs(5)))
            .with_launcher(launcher);
        let case = TestCase::builder("unused.toml")
            .predicate(|c, _| c.fail("never"))
            .build();

        // When
        let err = orchestrator.run(&case).await.unwrap_err();

        // Then: the engine exited inside the grace window, before teardown
        assert!(matches!(err, HarnessError::AssertionTimeout { .. }), "{err}");
        let exit = exits.try_recv().expect("engine exited before the verdict");
        assert!(exit.storage_present);
        assert!(exit.endpoint_exported);
    }
}
