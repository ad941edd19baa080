//! Storage layer for Refuge.
//!
//! Provides:
//! - The database seam and error classification
//! - Pooled SQLite store
//! - Lazy schema initialization
//! - The in-memory retry queue for user submissions
//! - Direct grievance and questionnaire queries

pub mod db;
pub mod grievances;
pub mod questionnaires;
pub mod queue;
pub mod schema;
pub mod sqlite;
