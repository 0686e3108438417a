//! Store metrics for observability

use crate::StorePath;
use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<StoreMetricsInner> = OnceLock::new();

struct StoreMetricsInner {
    reads: CounterVec,
    writes: CounterVec,
    removes: CounterVec,
    queries: CounterVec,
    listeners: CounterVec,
    errors: CounterVec,
}

impl StoreMetricsInner {
    fn new() -> Self {
        Self {
            reads: CounterVec::new(
                Opts::new("nova_store_reads_total", "Total single-path reads"),
                &["collection"],
            )
            .expect("valid metric definition"),
            writes: CounterVec::new(
                Opts::new("nova_store_writes_total", "Total single-path writes"),
                &["collection"],
            )
            .expect("valid metric definition"),
            removes: CounterVec::new(
                Opts::new("nova_store_removes_total", "Total single-path removes"),
                &["collection"],
            )
            .expect("valid metric definition"),
            queries: CounterVec::new(
                Opts::new("nova_store_queries_total", "Total range queries"),
                &["collection"],
            )
            .expect("valid metric definition"),
            listeners: CounterVec::new(
                Opts::new(
                    "nova_store_listeners_registered_total",
                    "Total listener registrations",
                ),
                &["collection"],
            )
            .expect("valid metric definition"),
            errors: CounterVec::new(
                Opts::new("nova_store_errors_total", "Total store errors"),
                &["collection", "operation"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.reads.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.removes.clone()))?;
        registry.register(Box::new(self.queries.clone()))?;
        registry.register(Box::new(self.listeners.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static StoreMetricsInner {
    METRICS.get_or_init(StoreMetricsInner::new)
}

/// Store metrics wrapper, labelled by collection (first path segment)
#[derive(Clone, Default)]
pub struct StoreMetrics;

impl StoreMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_read(&self, path: &StorePath) {
        get_metrics()
            .reads
            .with_label_values(&[path.collection_name()])
            .inc();
    }

    pub fn record_write(&self, path: &StorePath) {
        get_metrics()
            .writes
            .with_label_values(&[path.collection_name()])
            .inc();
    }

    pub fn record_remove(&self, path: &StorePath) {
        get_metrics()
            .removes
            .with_label_values(&[path.collection_name()])
            .inc();
    }

    pub fn record_query(&self, path: &StorePath) {
        get_metrics()
            .queries
            .with_label_values(&[path.collection_name()])
            .inc();
    }

    pub fn record_listener(&self, path: &StorePath) {
        get_metrics()
            .listeners
            .with_label_values(&[path.collection_name()])
            .inc();
    }

    pub fn record_error(&self, path: &StorePath, operation: &str) {
        get_metrics()
            .errors
            .with_label_values(&[path.collection_name(), operation])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_counter_labelled_by_collection() {
        let metrics = StoreMetrics::new();
        let path = StorePath::collection("metrics_test_feed").child("u1");
        metrics.record_write(&path);
        metrics.record_write(&path);

        let value = get_metrics()
            .writes
            .with_label_values(&["metrics_test_feed"])
            .get();
        assert_eq!(value, 2.0);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let registry = Registry::new();
        assert!(StoreMetrics::register(&registry).is_ok());
        assert!(StoreMetrics::register(&registry).is_err());
    }
}
