//! Observability infrastructure.
//!
//! Provides:
//! - Structured tracing via tracing-subscriber
//! - Prometheus metrics for writes, drains and queue depth
//! - HTTP endpoints for Prometheus scraping

pub mod metrics;
pub mod prometheus;
pub mod tracing;
