//! Race and shutdown coordination.
//!
//! [`race`] waits on the deadline, the poller and the launcher; the first to
//! resolve decides the [`Outcome`]. The losers are abandoned and whatever
//! they resolve to later is ignored. On the converged path [`shutdown`]
//! cancels the engine and gives it a bounded grace window to exit.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::signal::{CompletionSignal, ExitError};

/// The single result of a race.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The predicate converged (or there was none).
    Converged,
    /// The engine exited on its own, with its terminal error.
    ProcessExited(Option<ExitError>),
    /// The global deadline fired first.
    DeadlineExceeded,
}

impl Outcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, Outcome::Converged)
    }

    pub fn is_process_exited(&self) -> bool {
        matches!(self, Outcome::ProcessExited(_))
    }
}

/// How the shutdown handshake ended.
#[derive(Debug, Clone)]
pub enum ShutdownResult {
    /// The engine exited within the grace window.
    Exited(Option<ExitError>),
    /// The grace window elapsed first.
    GraceExpired,
}

/// Wait for the first of deadline, convergence and engine exit.
///
/// `deadline` must be armed before the poller and launcher are started.
/// Ties are broken in that order: an expired deadline always wins.
pub async fn race(
    deadline: Pin<&mut Sleep>,
    poller: &CompletionSignal<()>,
    launcher: &CompletionSignal<Option<ExitError>>,
) -> Outcome {
    let outcome = tokio::select! {
        biased;
        _ = deadline => Outcome::DeadlineExceeded,
        _ = poller.wait() => Outcome::Converged,
        exit = launcher.wait() => Outcome::ProcessExited(exit),
    };
    debug!(?outcome, "race decided");
    outcome
}

/// Cancel the engine and wait up to `grace` for it to exit.
pub async fn shutdown(
    scope: &CancellationToken,
    launcher: &CompletionSignal<Option<ExitError>>,
    grace: Duration,
) -> ShutdownResult {
    info!(grace = ?grace, "cancelling engine");
    scope.cancel();

    tokio::select! {
        biased;
        exit = launcher.wait() => ShutdownResult::Exited(exit),
        _ = tokio::time::sleep(grace) => ShutdownResult::GraceExpired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn converged_poller_wins() {
        let deadline = tokio::time::sleep(Duration::from_secs(60));
        tokio::pin!(deadline);
        let poller = CompletionSignal::new();
        let launcher = CompletionSignal::new();
        poller.resolve(());

        let outcome = race(deadline.as_mut(), &poller, &launcher).await;
        assert!(outcome.is_converged());
    }

    #[tokio::test]
    async fn launcher_exit_carries_error() {
        let deadline = tokio::time::sleep(Duration::from_secs(60));
        tokio::pin!(deadline);
        let poller = CompletionSignal::new();
        let launcher = CompletionSignal::new();
        launcher.resolve(Some(Arc::new(anyhow::anyhow!("load failed"))));

        match race(deadline.as_mut(), &poller, &launcher).await {
            Outcome::ProcessExited(Some(err)) => assert_eq!(err.to_string(), "load failed"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_when_nothing_resolves() {
        let deadline = tokio::time::sleep(Duration::from_secs(60));
        tokio::pin!(deadline);
        let poller = CompletionSignal::new();
        let launcher = CompletionSignal::new();

        let outcome = race(deadline.as_mut(), &poller, &launcher).await;
        assert!(matches!(outcome, Outcome::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_beats_simultaneous_signals() {
        let deadline = tokio::time::sleep(Duration::from_millis(10));
        tokio::pin!(deadline);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let poller = CompletionSignal::new();
        let launcher = CompletionSignal::new();
        poller.resolve(());
        launcher.resolve(None);

        let outcome = race(deadline.as_mut(), &poller, &launcher).await;
        assert!(matches!(outcome, Outcome::DeadlineExceeded));
    }

    #[tokio::test]
    async fn late_resolutions_do_not_change_the_outcome() {
        let deadline = tokio::time::sleep(Duration::from_secs(60));
        tokio::pin!(deadline);
        let poller = CompletionSignal::new();
        let launcher = CompletionSignal::new();
        poller.resolve(());

        let outcome = race(deadline.as_mut(), &poller, &launcher).await;
        launcher.resolve(Some(Arc::new(anyhow::anyhow!("late"))));
        assert!(outcome.is_converged());
        assert!(!poller.resolve(()), "the winning signal stays single-assignment");
    }

    #[tokio::test]
    async fn shutdown_cancels_and_collects_exit() {
        let scope = CancellationToken::new();
        let launcher = CompletionSignal::<Option<ExitError>>::new();
        let engine_scope = scope.clone();
        let engine_done = launcher.clone();
        tokio::spawn(async move {
            engine_scope.cancelled().await;
            engine_done.resolve(None);
        });

        let result = shutdown(&scope, &launcher, Duration::from_secs(5)).await;
        assert!(scope.is_cancelled());
        assert!(matches!(result, ShutdownResult::Exited(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_reports_expired_grace() {
        let scope = CancellationToken::new();
        let launcher = CompletionSignal::<Option<ExitError>>::new();

        let result = shutdown(&scope, &launcher, Duration::from_secs(5)).await;
        assert!(matches!(result, ShutdownResult::GraceExpired));
        assert!(scope.is_cancelled(), "cancellation is never retracted");
    }
}
