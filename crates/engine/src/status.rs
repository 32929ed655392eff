//! Status surface: an axum router on the engine's listen address.
//!
//! Routes:
//! - `GET /metrics` renders the default telemetry registry
//! - `GET /-/ready` reports readiness
//!
//! Anything else is a 404; a known path with another method is a 405.

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use flowline_core::metrics as m;
use flowline_core::telemetry;

use crate::component::Component;
use crate::error::EngineError;

/// Component id of the status server.
pub const STATUS_COMPONENT_ID: &str = "server.http";

/// Metrics route.
pub const METRICS_PATH: &str = "/metrics";

/// Readiness route.
pub const READY_PATH: &str = "/-/ready";

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// HTTP status surface.
pub struct StatusServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl StatusServer {
    /// Bind the listen address. Binding happens before the engine reports
    /// itself running so that address conflicts surface as load-time errors.
    pub async fn bind(addr: &str) -> Result<Self, EngineError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| EngineError::Bind {
                addr: addr.to_owned(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!(listen_addr = %local_addr, "status server bound");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The bound address (resolves `:0` to the actual port).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Component for StatusServer {
    fn id(&self) -> &str {
        STATUS_COMPONENT_ID
    }

    fn run(
        self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), EngineError>> + Send + 'static {
        async move {
            axum::serve(self.listener, router())
                .with_graceful_shutdown(cancel.cancelled_owned())
                .await?;
            info!(listen_addr = %self.local_addr, "status server stopped");
            Ok(())
        }
    }
}

/// The status routes.
pub fn router() -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .route(READY_PATH, get(ready_handler))
        .fallback(not_found)
}

async fn metrics_handler() -> impl IntoResponse {
    count_request(METRICS_PATH);
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        telemetry::default_registry().render(),
    )
}

async fn ready_handler() -> &'static str {
    count_request(READY_PATH);
    "Flowline is ready.\n"
}

async fn not_found() -> (StatusCode, &'static str) {
    count_request("other");
    (StatusCode::NOT_FOUND, "not found\n")
}

fn count_request(path: &'static str) {
    metrics::counter!(m::SERVER_HTTP_REQUESTS_TOTAL, m::LABEL_PATH => path).increment(1);
}
