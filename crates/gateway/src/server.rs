//! Gateway server — router assembly and HTTP/metrics startup.

use crate::auth::{self, AuthState};
use crate::gate::{self, GateState};
use crate::rest;
use axum::routing::{get, post};
use axum::{middleware, Router};
use rx_cache::ActivityCache;
use rx_core::config::AppConfig;
use rx_session::{tracing_audit, ActivityStore, SessionInvalidator};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state for the router.
#[derive(Clone)]
pub struct AppState {
    pub gate: GateState,
    pub auth: AuthState,
    pub node_id: String,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the subsystem around the given activity cache, with in-memory
    /// auth collaborators and the tracing audit sink.
    pub fn new(config: &AppConfig, cache: Arc<dyn ActivityCache>) -> Self {
        let auth = AuthState::new();
        let store = Arc::new(ActivityStore::new(cache.clone(), config.session.clone()));
        let invalidator = Arc::new(SessionInvalidator::new(
            cache,
            auth.revoker.clone(),
            tracing_audit(),
            config.session.timeout_minutes,
        ));

        Self {
            gate: GateState {
                store,
                invalidator,
                session: config.session.clone(),
            },
            auth,
            node_id: config.node_id.clone(),
            start_time: Instant::now(),
        }
    }
}

/// Build the full router: routes, the gate, the auth-context layer, and the
/// usual HTTP middleware. The auth layer is outermost so the gate always
/// sees its extensions.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(rest::health_check))
        .route("/v1/session", get(rest::session_status))
        .route("/v1/logout", post(rest::logout))
        .layer(middleware::from_fn_with_state(
            state.gate.clone(),
            gate::session_gate,
        ))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::attach_context,
        ))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main HTTP server for the session gateway.
pub struct GatewayServer {
    config: AppConfig,
    state: AppState,
}

impl GatewayServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the HTTP server (blocks until shutdown).
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics exporter on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
