//! Assertion poller.
//!
//! Re-evaluates the predicate at a fixed interval until one round records no
//! failures. Without a predicate convergence is immediate. The poller never
//! enforces a deadline; it stops when it converges or when the scope is
//! cancelled, which the orchestrator guarantees on every exit path.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::case::{AssertionFailure, Collect, Predicate};
use crate::runtime::RuntimeHandle;
use crate::signal::CompletionSignal;

/// Handle on a running (or already converged) poller.
#[derive(Debug)]
pub struct Poller {
    done: CompletionSignal<()>,
    failures: watch::Receiver<Vec<AssertionFailure>>,
    rounds: Arc<AtomicUsize>,
}

impl Poller {
    /// Resolves once a round reports zero failures.
    pub fn done(&self) -> &CompletionSignal<()> {
        &self.done
    }

    /// Failures of the most recent round.
    pub fn last_failures(&self) -> Vec<AssertionFailure> {
        self.failures.borrow().clone()
    }

    /// Rounds evaluated so far.
    pub fn rounds(&self) -> usize {
        self.rounds.load(Ordering::Acquire)
    }
}

/// Start polling `predicate` against `runtime` every `interval`.
///
/// The first evaluation happens one interval after the call.
pub fn poll(
    predicate: Option<Predicate>,
    runtime: Arc<RuntimeHandle>,
    interval: Duration,
    scope: CancellationToken,
) -> Poller {
    let done = CompletionSignal::new();
    let (failures_tx, failures) = watch::channel(Vec::new());
    let rounds = Arc::new(AtomicUsize::new(0));

    let Some(predicate) = predicate else {
        debug!("no predicate, converged immediately");
        done.resolve(());
        return Poller {
            done,
            failures,
            rounds,
        };
    };

    let signal = done.clone();
    let counter = Arc::clone(&rounds);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = scope.cancelled() => {
                    debug!("poller abandoned");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let mut collect = Collect::new();
            predicate(&mut collect, &runtime);
            let round = counter.fetch_add(1, Ordering::AcqRel) + 1;
            let failures = collect.into_failures();

            if failures.is_empty() {
                failures_tx.send_replace(Vec::new());
                debug!(round, "assertions converged");
                signal.resolve(());
                return;
            }
            trace!(round, failures = failures.len(), "assertions not yet satisfied");
            failures_tx.send_replace(failures);
        }
    });

    Poller {
        done,
        failures,
        rounds,
    }
}
