//! HTTP server setup and lifecycle.
//!
//! Configures the axum server with:
//! - Grievance, questionnaire and admin handlers
//! - Optional Prometheus endpoint on its own port
//! - Graceful shutdown with a final queue drain

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::observability::metrics::{init_metrics, prometheus_registry};
use crate::observability::prometheus::run_prometheus_server;
use crate::service;
use crate::storage::db::Database;
use crate::storage::queue::{QueueConfig, WriteQueue};
use crate::storage::schema::SchemaManager;
use crate::storage::sqlite::SqliteDatabase;

/// Server state shared across handlers.
pub struct ServerState {
    pub db: Arc<dyn Database>,
    pub schema: SchemaManager,
    pub queue: WriteQueue,
    pub admin_password: Option<String>,
}

impl ServerState {
    pub fn new(
        db: Arc<dyn Database>,
        queue_config: QueueConfig,
        admin_password: Option<String>,
    ) -> Self {
        Self {
            schema: SchemaManager::new(Arc::clone(&db)),
            queue: WriteQueue::new(Arc::clone(&db), queue_config),
            db,
            admin_password,
        }
    }

    /// Make sure the schema exists, tolerating failure.
    ///
    /// Writes still go ahead when this fails; they will land in the queue.
    pub async fn ensure_schema(&self) {
        if let Err(e) = self.schema.ensure_ready().await {
            tracing::warn!(error = %e, "Continuing without confirmed schema");
        }
    }
}

/// Run the Refuge HTTP server.
///
/// # Arguments
///
/// * `config` - Server configuration
/// * `shutdown_rx` - Receiver for shutdown signal
///
/// # Returns
///
/// Returns when the server has shut down.
pub async fn run_server(
    config: Config,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let db = SqliteDatabase::open(
        &config.database,
        config.db_pool_size,
        Duration::from_millis(config.busy_timeout_ms),
    )?;

    let state = Arc::new(ServerState::new(
        Arc::new(db),
        config.queue_config(),
        config.admin_password.clone(),
    ));

    // Not fatal: every request retries schema creation.
    state.ensure_schema().await;

    if config.admin_password.is_none() {
        tracing::warn!("No admin password configured, admin API is disabled");
    }

    // Spawn Prometheus metrics server if enabled
    if config.metrics_enabled {
        init_metrics();
        let metrics_addr: SocketAddr = format!("{}:{}", config.host, config.metrics_port).parse()?;
        let registry = prometheus_registry();
        let metrics_state = Arc::clone(&state);
        let metrics_shutdown_rx = shutdown_rx.clone();

        tokio::spawn(async move {
            if let Err(e) =
                run_prometheus_server(metrics_addr, registry, metrics_state, metrics_shutdown_rx)
                    .await
            {
                tracing::error!(error = %e, "Prometheus server error");
            }
        });
    }

    let app = service::router(Arc::clone(&state)).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Starting Refuge HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            tracing::info!("Shutdown signal received, stopping server");
        })
        .await?;

    // The queue dies with the process; give pending writes one last chance.
    if !state.queue.is_empty() {
        let report = state.queue.drain().await;
        let remaining = state.queue.len();
        if remaining > 0 {
            tracing::error!(
                persisted = report.persisted,
                remaining,
                "Exiting with unwritten submissions in the retry queue"
            );
        } else {
            tracing::info!(persisted = report.persisted, "Retry queue flushed on shutdown");
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
