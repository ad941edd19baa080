//! Refuge: intake backend for gender-based-violence grievances and surveys.
//!
//! Submissions must never be lost to a transient database hiccup, so every
//! user-facing write goes through an in-process retry queue that drains
//! lazily on the next incoming write.
//!
//! # Architecture
//!
//! - **Schema manager**: idempotent, lazily retried table/index creation
//! - **Write queue**: direct write first, buffer in memory on retryable failure
//! - **Direct reads**: tracking lookup, admin listing and stats bypass the queue
//! - **Observable**: structured tracing and Prometheus metrics
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`model`]: Grievance and questionnaire domain types
//! - [`observability`]: Metrics and tracing setup
//! - [`server`]: HTTP server setup and shared state
//! - [`service`]: HTTP handlers (grievance, questionnaire, admin)
//! - [`storage`]: Database seam, SQLite store, schema and write queue
//! - [`tracking`]: Tracking code generation

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions,    // storage::queue::QueueStatus is fine
    clippy::must_use_candidate,         // Not all functions need #[must_use]
    clippy::missing_errors_doc,         // Error docs can be verbose
    clippy::missing_panics_doc,         // Panic docs can be verbose
    clippy::needless_raw_string_hashes, // r#""# is fine for SQL
    clippy::struct_excessive_bools,     // Config structs may have flags
    clippy::too_many_lines              // Some functions are inherently long
)]

pub mod config;
pub mod model;
pub mod observability;
pub mod server;
pub mod service;
pub mod storage;
pub mod tracking;

use uuid::Uuid;

/// Generate a local identifier for a queued write operation.
///
/// The kind prefix keeps log lines readable; the UUIDv7 suffix sorts by
/// creation time.
///
/// # Example
///
/// ```
/// let id = refuge::generate_operation_id("grievance");
/// assert!(id.starts_with("grievance_"));
/// ```
#[must_use]
pub fn generate_operation_id(kind: &str) -> String {
    format!("{kind}_{}", Uuid::now_v7().simple())
}

/// Get the current Unix timestamp in milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_ids_are_unique() {
        let a = generate_operation_id("questionnaire");
        let b = generate_operation_id("questionnaire");
        assert_ne!(a, b);
        assert!(a.starts_with("questionnaire_"));
    }

    #[test]
    fn test_now_millis_is_after_2024() {
        assert!(now_millis() > 1_704_067_200_000);
    }
}
