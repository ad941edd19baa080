//! Configuration parsing for the Refuge server.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Sensible defaults for quick start

use clap::Parser;
use std::path::PathBuf;

use crate::storage::queue::{QueueConfig, RetryPolicy, DEFAULT_MAX_ATTEMPTS};

/// Refuge: grievance and survey intake backend.
#[derive(Parser, Debug, Clone)]
#[command(name = "refuge")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "REFUGE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "REFUGE_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Path to the SQLite database file
    #[arg(short, long, env = "REFUGE_DATABASE", default_value = "./data/refuge.db")]
    pub database: PathBuf,

    /// Size of the database connection pool
    #[arg(long, env = "REFUGE_DB_POOL_SIZE", default_value_t = 10)]
    pub db_pool_size: u32,

    /// How long a connection waits on a locked database before failing
    #[arg(long, env = "REFUGE_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Drain attempts before a queued write is discarded
    #[arg(long, env = "REFUGE_MAX_RETRY_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_retry_attempts: u32,

    /// Queue every failed write, including constraint and query errors
    #[arg(long, env = "REFUGE_RETRY_ALL_ERRORS")]
    pub retry_all_errors: bool,

    /// Password for the admin endpoints (admin API disabled when unset)
    #[arg(long, env = "REFUGE_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Serve Prometheus metrics on a separate port
    #[arg(long, env = "REFUGE_METRICS_ENABLED")]
    pub metrics_enabled: bool,

    /// Port for the metrics endpoint
    #[arg(long, env = "REFUGE_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Queue settings derived from this configuration.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_attempts: self.max_retry_attempts.max(1),
            retry_policy: if self.retry_all_errors {
                RetryPolicy::RetryAll
            } else {
                RetryPolicy::RetryableOnly
            },
        }
    }

    /// Create a configuration for testing against a scratch database.
    pub fn test_config(database: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            database,
            db_pool_size: 4,
            busy_timeout_ms: 1000,
            log_level: "debug".into(),
            admin_password: Some("test-admin".into()),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            database: PathBuf::from("./data/refuge.db"),
            db_pool_size: 10,
            busy_timeout_ms: 5000,
            max_retry_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_all_errors: false,
            admin_password: None,
            log_level: "info".into(),
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}
