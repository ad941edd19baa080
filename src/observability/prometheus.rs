//! Prometheus HTTP endpoint for metrics scraping.
//!
//! Provides:
//! - `/metrics` - Prometheus metrics endpoint
//! - `/health` - Basic health check
//! - `/ready` - 503 until the database schema exists

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use prometheus::{Encoder, Registry, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

use crate::server::ServerState;
use crate::storage::schema::SchemaState;

/// Prometheus server state.
#[derive(Clone)]
pub struct PrometheusState {
    registry: Arc<Registry>,
    server: Arc<ServerState>,
}

impl PrometheusState {
    /// Scrape `registry`; report readiness from `server`.
    pub fn new(registry: Registry, server: Arc<ServerState>) -> Self {
        Self {
            registry: Arc::new(registry),
            server,
        }
    }
}

/// Create the Prometheus HTTP router.
pub fn create_router(state: PrometheusState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}

/// Handle GET /metrics - Prometheus metrics endpoint.
async fn metrics_handler(State(state): State<PrometheusState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                format!("Failed to encode metrics: {e}").into_bytes(),
            )
        }
    }
}

/// Handle GET /health - Basic health check.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Handle GET /ready - schema state plus the retry backlog.
async fn ready_handler(State(state): State<PrometheusState>) -> impl IntoResponse {
    let schema = state.server.schema.state().await;
    let queue_length = state.server.queue.len();
    let (status, schema_label) = match &schema {
        SchemaState::Ready => (StatusCode::OK, "ready"),
        SchemaState::Uninitialized => (StatusCode::SERVICE_UNAVAILABLE, "uninitialized"),
        SchemaState::Failed { .. } => (StatusCode::SERVICE_UNAVAILABLE, "failed"),
    };
    (
        status,
        Json(json!({ "schema": schema_label, "queueLength": queue_length })),
    )
}

/// Run the Prometheus HTTP server until `shutdown_rx` fires.
pub async fn run_prometheus_server(
    addr: SocketAddr,
    registry: Registry,
    server: Arc<ServerState>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(PrometheusState::new(registry, server));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Starting Prometheus metrics server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            tracing::info!("Prometheus server shutting down");
        })
        .await?;

    Ok(())
}
