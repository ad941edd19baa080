//! Test utilities for Refuge integration tests.
//!
//! Provides:
//! - A scratch SQLite database in a temporary directory
//! - A store wrapper that can simulate an outage
//! - Sample grievance payloads

#![allow(dead_code)]

use async_trait::async_trait;
use refuge::model::{GrievanceType, Locale, NewGrievance};
use refuge::observability::tracing::init_test_tracing;
use refuge::server::ServerState;
use refuge::storage::db::{Database, DbError, ResultSet, Statement};
use refuge::storage::queue::QueueConfig;
use refuge::storage::sqlite::SqliteDatabase;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Admin password used by fixtures.
pub const ADMIN_PASSWORD: &str = "test-admin";

/// Real SQLite store that fails every statement while offline.
pub struct SwitchableDatabase {
    inner: SqliteDatabase,
    online: AtomicBool,
    rejected: AtomicUsize,
}

impl SwitchableDatabase {
    pub fn new(inner: SqliteDatabase) -> Self {
        Self {
            inner,
            online: AtomicBool::new(true),
            rejected: AtomicUsize::new(0),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Statements refused while offline.
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Database for SwitchableDatabase {
    async fn execute(&self, statement: Statement) -> Result<ResultSet, DbError> {
        if !self.online.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(DbError::Unavailable("simulated outage: connection refused".into()));
        }
        self.inner.execute(statement).await
    }
}

/// Test fixture that manages a temporary database directory.
///
/// The directory is automatically cleaned up when the fixture is dropped.
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub db: Arc<SwitchableDatabase>,
    pub state: Arc<ServerState>,
}

impl TestFixture {
    /// Fresh store with the schema created and the default queue policy.
    pub async fn new() -> Self {
        Self::with_queue_config(QueueConfig::default()).await
    }

    pub async fn with_queue_config(queue_config: QueueConfig) -> Self {
        let fixture = Self::without_schema(queue_config);
        fixture
            .state
            .schema
            .ensure_ready()
            .await
            .expect("schema initialization failed");
        fixture
    }

    /// Fresh store whose tables have not been created yet.
    pub fn without_schema(queue_config: QueueConfig) -> Self {
        init_test_tracing();
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let sqlite = SqliteDatabase::open(temp_dir.path().join("test.db"), 4, Duration::from_secs(1))
            .expect("failed to open test database");
        let db = Arc::new(SwitchableDatabase::new(sqlite));

        let state = Arc::new(ServerState::new(
            db.clone(),
            queue_config,
            Some(ADMIN_PASSWORD.to_string()),
        ));

        Self {
            temp_dir,
            db,
            state,
        }
    }

    pub fn store(&self) -> &dyn Database {
        self.db.as_ref()
    }
}

/// An anonymous grievance with the given tracking code.
pub fn sample_grievance(tracking_code: &str) -> NewGrievance {
    NewGrievance {
        tracking_code: tracking_code.to_string(),
        complainant_name: None,
        complainant_email: None,
        complainant_phone: None,
        is_anonymous: true,
        village_id: Some("11".into()),
        custom_location: None,
        grievance_type: GrievanceType::Harassment,
        description: "Repeated verbal harassment at the market".into(),
        incident_date: Some("2026-09-30".into()),
        preferred_language: Locale::Ar,
    }
}

/// A 12-character code unique per `n`, drawn from the tracking alphabet.
pub fn code(n: usize) -> String {
    const ALPHABET: &[u8] = refuge::tracking::TRACKING_ALPHABET;
    let mut out = String::from("TEST");
    let mut rest = n;
    for _ in 0..8 {
        out.push(ALPHABET[rest % ALPHABET.len()] as char);
        rest /= ALPHABET.len();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        assert_ne!(code(1), code(2));
        assert_eq!(code(7).len(), 12);
    }
}
