//! SQLite-backed implementation of [`Database`].
//!
//! Uses r2d2 with r2d2_sqlite for pooled access. Statements run on the
//! blocking thread pool so the async request handlers never block on disk.
//! The dialect matches the libSQL servers the portal can also point at.

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::db::{Database, DbError, ResultSet, Row, Statement, Value};

/// Pooled SQLite database.
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteDatabase {
    /// Open (creating if needed) the database file at `db_path`.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the SQLite database file
    /// * `max_size` - Maximum number of connections in the pool
    /// * `busy_timeout` - How long a connection waits on a locked database
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub fn open<P: AsRef<Path>>(
        db_path: P,
        max_size: u32,
        busy_timeout: Duration,
    ) -> Result<Self, DbError> {
        let manager = SqliteConnectionManager::file(db_path);
        Self::from_manager(manager, max_size, busy_timeout)
    }

    fn from_manager(
        manager: SqliteConnectionManager,
        max_size: u32,
        busy_timeout: Duration,
    ) -> Result<Self, DbError> {
        let pool = Pool::builder()
            .max_size(max_size)
            .connection_timeout(busy_timeout.max(Duration::from_millis(250)))
            .connection_customizer(Box::new(ConnectionCustomizer { busy_timeout }))
            .build(manager)?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn execute(&self, statement: Statement) -> Result<ResultSet, DbError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            run_statement(&conn, &statement)
        })
        .await
        .map_err(|e| DbError::Unavailable(format!("database task failed: {e}")))?
    }
}

fn run_statement(conn: &rusqlite::Connection, statement: &Statement) -> Result<ResultSet, DbError> {
    let mut stmt = conn.prepare_cached(&statement.sql)?;
    let params = rusqlite::params_from_iter(statement.args.iter());

    let columns: Arc<[String]> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>()
        .into();

    if columns.is_empty() {
        let changed = stmt.execute(params)?;
        return Ok(ResultSet {
            rows: Vec::new(),
            rows_affected: changed as u64,
            last_insert_id: conn.last_insert_rowid(),
        });
    }

    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.query(params)?;
    while let Some(row) = cursor.next()? {
        let values = (0..width)
            .map(|idx| row.get::<_, Value>(idx))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(Row::new(Arc::clone(&columns), values));
    }

    Ok(ResultSet {
        rows,
        rows_affected: 0,
        last_insert_id: conn.last_insert_rowid(),
    })
}

/// Apply per-connection pragmas.
///
/// WAL lets the admin dashboard read while submissions write.
fn apply_pragmas(conn: &rusqlite::Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", true)
}

/// Connection customizer that applies pragmas on acquire.
#[derive(Debug)]
struct ConnectionCustomizer {
    busy_timeout: Duration,
}

impl r2d2::CustomizeConnection<rusqlite::Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        apply_pragmas(conn, self.busy_timeout)
    }
}
