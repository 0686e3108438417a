//! Feed-layer metrics

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<FeedMetricsInner> = OnceLock::new();

struct FeedMetricsInner {
    fanout_writes: CounterVec,
    compensations: CounterVec,
    pages_served: CounterVec,
}

impl FeedMetricsInner {
    fn new() -> Self {
        Self {
            fanout_writes: CounterVec::new(
                Opts::new(
                    "social_fanout_writes_total",
                    "Feed entry writes issued by fan-out, backfill and teardown",
                ),
                &["operation", "outcome"],
            )
            .expect("valid metric definition"),
            compensations: CounterVec::new(
                Opts::new(
                    "social_saga_compensations_total",
                    "Compensating actions run after a failed multi-path write",
                ),
                &["saga"],
            )
            .expect("valid metric definition"),
            pages_served: CounterVec::new(
                Opts::new("social_pages_served_total", "Cursor pages served"),
                &["collection"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.fanout_writes.clone()))?;
        registry.register(Box::new(self.compensations.clone()))?;
        registry.register(Box::new(self.pages_served.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static FeedMetricsInner {
    METRICS.get_or_init(FeedMetricsInner::new)
}

#[derive(Clone, Default)]
pub struct FeedMetrics;

impl FeedMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_fanout_write(&self, operation: &str, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        get_metrics()
            .fanout_writes
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn record_compensation(&self, saga: &str) {
        get_metrics().compensations.with_label_values(&[saga]).inc();
    }

    pub fn record_page(&self, collection: &str) {
        get_metrics()
            .pages_served
            .with_label_values(&[collection])
            .inc();
    }
}

/// Register store and feed metrics with one registry
pub fn register_all(registry: &Registry) -> Result<(), prometheus::Error> {
    doc_store::StoreMetrics::register(registry)?;
    FeedMetrics::register(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fanout_outcomes_counted_separately() {
        let metrics = FeedMetrics::new();
        metrics.record_fanout_write("metrics_test_publish", true);
        metrics.record_fanout_write("metrics_test_publish", true);
        metrics.record_fanout_write("metrics_test_publish", false);

        let ok = get_metrics()
            .fanout_writes
            .with_label_values(&["metrics_test_publish", "ok"])
            .get();
        let failed = get_metrics()
            .fanout_writes
            .with_label_values(&["metrics_test_publish", "error"])
            .get();
        assert_eq!((ok, failed), (2.0, 1.0));
    }

    #[test]
    fn test_register_once() {
        let registry = Registry::new();
        assert!(register_all(&registry).is_ok());
        assert!(FeedMetrics::register(&registry).is_err());

        FeedMetrics::new().record_page("metrics_test_feed");
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.iter().any(|n| n == "social_pages_served_total"));
    }
}
