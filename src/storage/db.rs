//! Database seam used by the schema manager, the write queue and the
//! direct read paths.
//!
//! The store is anything that can run one parameterized statement and hand
//! back rows plus the generated row id. Errors carry a stable class so the
//! queue can tell a network blip from a write that will never succeed.

use async_trait::async_trait;
use rusqlite::ErrorCode;
use std::sync::Arc;
use thiserror::Error;

pub use rusqlite::types::Value;

/// Stable classification for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The store could not be reached or was temporarily busy.
    Retryable,
    /// The store rejected the statement; retrying will fail the same way.
    Permanent,
}

/// Error type for database operations.
#[derive(Debug, Clone, Error)]
pub enum DbError {
    #[error("database unavailable: {0}")]
    Unavailable(String),

    /// A table or index the statement needs has not been created yet.
    #[error("schema not ready: {0}")]
    SchemaMissing(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("unexpected row shape: {0}")]
    Decode(String),
}

impl DbError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unavailable(_) | Self::SchemaMissing(_) => ErrorClass::Retryable,
            Self::Constraint(_) | Self::Query(_) | Self::Decode(_) => ErrorClass::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message) => match failure.code {
                ErrorCode::ConstraintViolation => Self::Constraint(err.to_string()),
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
                | ErrorCode::OutOfMemory
                | ErrorCode::FileLockingProtocolFailed => Self::Unavailable(err.to_string()),
                ErrorCode::Unknown if is_missing_schema(message.as_deref()) => {
                    Self::SchemaMissing(err.to_string())
                }
                _ => Self::Query(err.to_string()),
            },
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::InvalidColumnIndex(_)
            | rusqlite::Error::InvalidColumnName(_) => Self::Decode(err.to_string()),
            _ => Self::Query(err.to_string()),
        }
    }
}

/// SQLite reports a missing table as a generic `SQLITE_ERROR`; only the
/// message tells it apart from a malformed statement.
fn is_missing_schema(message: Option<&str>) -> bool {
    message.is_some_and(|m| m.starts_with("no such table") || m.starts_with("no such index"))
}

impl From<r2d2::Error> for DbError {
    fn from(err: r2d2::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// A single parameterized statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Rows and write metadata returned by [`Database::execute`].
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
    /// Row id generated by the most recent insert on the connection.
    pub last_insert_id: i64,
}

impl ResultSet {
    /// The first row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Read `column` of the first row as a count; absent rows count as zero.
    pub fn count(&self, column: &str) -> Result<u64, DbError> {
        match self.first() {
            Some(row) => Ok(row.i64(column)?.max(0) as u64),
            None => Ok(0),
        }
    }
}

/// One result row with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn get(&self, column: &str) -> Result<&Value, DbError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| DbError::Decode(format!("missing column {column}")))
    }

    pub fn i64(&self, column: &str) -> Result<i64, DbError> {
        match self.get(column)? {
            Value::Integer(v) => Ok(*v),
            other => Err(type_mismatch(column, "integer", other)),
        }
    }

    pub fn bool(&self, column: &str) -> Result<bool, DbError> {
        match self.get(column)? {
            Value::Null => Ok(false),
            Value::Integer(v) => Ok(*v != 0),
            other => Err(type_mismatch(column, "integer", other)),
        }
    }

    pub fn text(&self, column: &str) -> Result<String, DbError> {
        self.opt_text(column)?
            .ok_or_else(|| DbError::Decode(format!("column {column} is null")))
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<String>, DbError> {
        match self.get(column)? {
            Value::Null => Ok(None),
            Value::Text(v) => Ok(Some(v.clone())),
            other => Err(type_mismatch(column, "text", other)),
        }
    }

    /// Parse a text column into a domain enum.
    pub fn parse<T>(&self, column: &str) -> Result<T, DbError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.text(column)?
            .parse()
            .map_err(|e: T::Err| DbError::Decode(format!("column {column}: {e}")))
    }
}

fn type_mismatch(column: &str, expected: &str, got: &Value) -> DbError {
    DbError::Decode(format!(
        "column {column}: expected {expected}, got {:?}",
        got.data_type()
    ))
}

/// Convert an optional string into a bindable value.
pub fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.to_string()))
}

/// The database collaborator.
///
/// Implementations must be safe to share across concurrent requests; the
/// write queue never holds its own lock across a call to `execute`.
#[async_trait]
pub trait Database: Send + Sync {
    async fn execute(&self, statement: Statement) -> Result<ResultSet, DbError>;
}

#[async_trait]
impl<D: Database + ?Sized> Database for Arc<D> {
    async fn execute(&self, statement: Statement) -> Result<ResultSet, DbError> {
        (**self).execute(statement).await
    }
}
