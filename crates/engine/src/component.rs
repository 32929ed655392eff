//! Component trait: the unit of work the engine schedules.
//!
//! A component runs until its cancellation token fires and then returns.
//! Returning before cancellation is treated by the engine as a failure.
//!
//! [`Component`] uses RPITIT and is not dyn-compatible; [`DynComponent`] is
//! the boxed counterpart the engine stores in `Vec<Box<dyn DynComponent>>`.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Component id prefix for scrape components.
pub const SCRAPE_ID_PREFIX: &str = "prometheus.scrape";

/// Component id prefix for remote-write components.
pub const REMOTE_WRITE_ID_PREFIX: &str = "prometheus.remote_write";

/// Build a component id such as `prometheus.scrape.agent_self`.
pub fn component_id(prefix: &str, name: &str) -> String {
    format!("{prefix}.{name}")
}

/// A long-running pipeline component.
pub trait Component: Send {
    /// Stable identifier, also used as the `component_id` metric label.
    fn id(&self) -> &str;

    /// Run until `cancel` fires.
    fn run(
        self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), EngineError>> + Send + 'static
    where
        Self: Sized;
}

/// dyn-compatible component.
pub trait DynComponent: Send {
    /// Stable identifier.
    fn id(&self) -> &str;

    /// Run until `cancel` fires.
    fn run_boxed(self: Box<Self>, cancel: CancellationToken)
    -> BoxFuture<'static, Result<(), EngineError>>;
}

impl<T: Component + 'static> DynComponent for T {
    fn id(&self) -> &str {
        Component::id(self)
    }

    fn run_boxed(
        self: Box<Self>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<(), EngineError>> {
        Box::pin((*self).run(cancel))
    }
}
