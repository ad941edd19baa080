//! Prometheus metrics implementation.
//!
//! Key metrics:
//! - refuge_writes_total: Counter of submissions by kind and outcome
//! - refuge_drain_total: Counter of drain retries by kind and outcome
//! - refuge_queue_depth: Gauge of writes waiting in memory

use prometheus::{IntCounterVec, IntGauge, Opts, Registry};
use std::sync::OnceLock;

/// Global metrics instance.
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Refuge metrics registry.
#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    /// Submissions by `kind` and `outcome` (persisted, queued, rejected).
    pub writes_total: IntCounterVec,
    /// Drain retries by `kind` and `outcome` (persisted, requeued, dropped).
    pub drain_total: IntCounterVec,
    /// Writes currently waiting in the retry queue.
    pub queue_depth: IntGauge,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let writes_total = IntCounterVec::new(
            Opts::new("refuge_writes_total", "Submissions by kind and outcome"),
            &["kind", "outcome"],
        )
        .expect("valid metric definition");
        let drain_total = IntCounterVec::new(
            Opts::new("refuge_drain_total", "Queued write retries by kind and outcome"),
            &["kind", "outcome"],
        )
        .expect("valid metric definition");
        let queue_depth = IntGauge::new("refuge_queue_depth", "Writes waiting in the retry queue")
            .expect("valid metric definition");

        for collector in [
            Box::new(writes_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(drain_total.clone()),
            Box::new(queue_depth.clone()),
        ] {
            if let Err(e) = registry.register(collector) {
                tracing::warn!(error = %e, "Failed to register metric");
            }
        }

        Self {
            registry,
            writes_total,
            drain_total,
            queue_depth,
        }
    }
}

/// Initialize the metrics system.
///
/// This should be called once at startup. Subsequent calls are ignored.
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Registry to expose on the scrape endpoint.
pub fn prometheus_registry() -> Registry {
    init_metrics().registry.clone()
}

/// Record the outcome of a submission.
pub fn record_write(kind: &str, outcome: &str) {
    if let Some(m) = METRICS.get() {
        m.writes_total.with_label_values(&[kind, outcome]).inc();
    }
}

/// Record the outcome of one drain retry.
pub fn record_drain(kind: &str, outcome: &str) {
    if let Some(m) = METRICS.get() {
        m.drain_total.with_label_values(&[kind, outcome]).inc();
    }
}

/// Record the current queue length.
pub fn set_queue_depth(depth: usize) {
    if let Some(m) = METRICS.get() {
        m.queue_depth.set(depth as i64);
    }
}
