//! Refuge: grievance and survey intake backend.
//!
//! # Usage
//!
//! ```bash
//! refuge --port 3000 --database ./data/refuge.db --log-level info
//! ```
//!
//! Environment variables can also be used:
//! - `REFUGE_PORT`: Port to listen on
//! - `REFUGE_DATABASE`: SQLite database file
//! - `REFUGE_ADMIN_PASSWORD`: Enables the admin API
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use anyhow::Context;
use refuge::config::Config;
use refuge::observability::metrics::init_metrics;
use refuge::observability::tracing::init_tracing;
use refuge::server::run_server;
use std::fs;
use tokio::sync::watch;

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        r#"
  Refuge v{} - grievance intake

  Configuration:
    Address:      {}:{}
    Database:     {}
    Retry budget: {} attempts
    Admin API:    {}
    Log Level:    {}

  Press Ctrl+C to shutdown gracefully.
"#,
        version,
        config.host,
        config.port,
        config.database.display(),
        config.max_retry_attempts,
        if config.admin_password.is_some() {
            "enabled"
        } else {
            "disabled"
        },
        config.log_level
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    // Initialize tracing/logging
    init_tracing(&config.log_level);

    // Metrics are recorded even when the scrape endpoint is off
    init_metrics();

    // Ensure database directory exists
    if let Some(parent) = config.database.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    print_banner(&config);

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn signal handler task
    tokio::spawn(async move {
        // Wait for SIGTERM or SIGINT (Ctrl+C)
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                        }
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, initiating shutdown...");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }

        // Signal shutdown
        let _ = shutdown_tx.send(true);
    });

    run_server(config, shutdown_rx)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("Refuge shutdown complete");
    Ok(())
}
