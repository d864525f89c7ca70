//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request span, observability)
//! - Bind server to listener
//! - Graceful shutdown with a bounded drain

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::http::handlers::{self, AppState};
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::tracing::make_request_span;
use crate::observability::{observe_request, ObservabilityContext};

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server.
    ///
    /// `prometheus` backs the scrape route; without it the route answers 404.
    pub fn new(
        config: AppConfig,
        observability: Arc<ObservabilityContext>,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        let state = AppState {
            metrics: observability.metrics().clone(),
            prometheus,
        };
        let router = Self::build_router(&config, state, observability);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &AppConfig,
        state: AppState,
        observability: Arc<ObservabilityContext>,
    ) -> Router {
        let mut router = Router::new()
            .route("/ping", get(handlers::ping))
            .route("/healthz", get(handlers::healthz));

        if config.observability.metrics_enabled {
            router = router.route(&config.observability.metrics_path, get(handlers::metrics));
        }

        // The span layer is outermost so the middleware runs inside the request span.
        router
            .with_state(state)
            .layer(from_fn_with_state(observability, observe_request))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve until `shutdown` fires or the process is signalled, then drain.
    ///
    /// Connections still open after `shutdown_timeout_secs` are dropped.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let draining = Arc::new(Notify::new());
        let trigger = draining.clone();
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.recv() => {}
                    _ = shutdown_signal() => {}
                }
                tracing::info!("Shutdown signal received, draining connections");
                trigger.notify_one();
            })
            .into_future();

        let drain_timeout = Duration::from_secs(self.config.listener.shutdown_timeout_secs);
        let deadline = async move {
            draining.notified().await;
            tokio::time::sleep(drain_timeout).await;
        };

        tokio::select! {
            result = serve => result?,
            _ = deadline => {
                tracing::warn!(
                    timeout_secs = drain_timeout.as_secs(),
                    "Drain timeout elapsed, dropping open connections"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
