//! Schema creation for the grievance store.
//!
//! Tables are created lazily the first time a request needs them. A failed
//! attempt leaves the manager uninitialized-in-effect, so the next request
//! tries again.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use super::db::{Database, DbError};

/// DDL statements run in order on first use.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS grievances (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tracking_code TEXT UNIQUE NOT NULL,
        complainant_name TEXT,
        complainant_email TEXT,
        complainant_phone TEXT,
        is_anonymous INTEGER DEFAULT 0,
        village_id TEXT,
        custom_location TEXT,
        grievance_type TEXT NOT NULL,
        description TEXT NOT NULL,
        incident_date TEXT,
        preferred_language TEXT DEFAULT 'ar',
        status TEXT DEFAULT 'submitted',
        admin_notes TEXT,
        status_updated_at TEXT,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS questionnaire_responses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        response_data TEXT NOT NULL,
        submitted_at TEXT DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_grievances_tracking_code ON grievances(tracking_code)",
    "CREATE INDEX IF NOT EXISTS idx_grievances_status ON grievances(status)",
    "CREATE INDEX IF NOT EXISTS idx_grievances_created_at ON grievances(created_at)",
];

/// Error type for schema initialization.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("schema initialization failed: {0}")]
    Init(#[from] DbError),
}

/// Initialization state of the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SchemaState {
    #[default]
    Uninitialized,
    Ready,
    /// Last attempt failed; the next `ensure_ready` retries.
    Failed { attempts: u32, last_error: String },
}

/// Owns one-time creation of tables and indexes.
///
/// The state lock is held for the whole DDL run, so concurrent first
/// requests wait for a single initializer instead of racing it.
pub struct SchemaManager {
    db: Arc<dyn Database>,
    state: Mutex<SchemaState>,
}

impl SchemaManager {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            state: Mutex::new(SchemaState::Uninitialized),
        }
    }

    /// Create the schema if it has not been created yet.
    ///
    /// Safe to call on every request; after the first success it only
    /// takes the state lock.
    pub async fn ensure_ready(&self) -> Result<(), SchemaError> {
        let mut state = self.state.lock().await;
        if *state == SchemaState::Ready {
            return Ok(());
        }

        match self.create_schema().await {
            Ok(()) => {
                *state = SchemaState::Ready;
                tracing::info!("Database schema initialized");
                Ok(())
            }
            Err(e) => {
                let attempts = match &*state {
                    SchemaState::Failed { attempts, .. } => attempts + 1,
                    _ => 1,
                };
                tracing::error!(error = %e, attempts, "Database schema initialization failed");
                *state = SchemaState::Failed {
                    attempts,
                    last_error: e.to_string(),
                };
                Err(SchemaError::Init(e))
            }
        }
    }

    /// Current initialization state.
    pub async fn state(&self) -> SchemaState {
        self.state.lock().await.clone()
    }

    async fn create_schema(&self) -> Result<(), DbError> {
        for ddl in SCHEMA {
            self.db.execute((*ddl).into()).await?;
        }
        Ok(())
    }
}
