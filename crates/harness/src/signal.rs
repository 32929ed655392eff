//! Single-assignment completion signal.
//!
//! A [`CompletionSignal`] resolves at most once; every waiter, present or
//! future, observes the same value. Later `resolve` calls are ignored, which
//! is what lets abandoned race participants finish without affecting the
//! outcome.

use std::sync::Arc;

use tokio::sync::watch;

/// Terminal error reported by the engine task.
pub type ExitError = Arc<anyhow::Error>;

/// Single-assignment, multi-waiter future value.
#[derive(Debug)]
pub struct CompletionSignal<T> {
    tx: Arc<watch::Sender<Option<T>>>,
}

impl<T> Clone for CompletionSignal<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone> Default for CompletionSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> CompletionSignal<T> {
    /// An unresolved signal.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Resolve with `value`. Returns `false` if already resolved.
    pub fn resolve(&self, value: T) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        })
    }

    /// Wait for the resolution.
    pub async fn wait(&self) -> T {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(value) = rx.borrow_and_update().as_ref() {
                return value.clone();
            }
            // `self` keeps the sender alive, so the channel never closes here.
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }

    /// The resolved value, if any.
    pub fn try_get(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// Whether the signal has resolved.
    pub fn is_resolved(&self) -> bool {
        self.tx.borrow().is_some()
    }
}
