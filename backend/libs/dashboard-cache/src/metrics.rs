//! Cache metrics for observability

use crate::CacheKey;
use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<CacheMetricsInner> = OnceLock::new();

struct CacheMetricsInner {
    hits: CounterVec,
    misses: CounterVec,
    stale_reads: CounterVec,
    writes: CounterVec,
    invalidations: CounterVec,
    errors: CounterVec,
}

fn counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    CounterVec::new(Opts::new(name, help), labels).expect("valid metric definition")
}

impl CacheMetricsInner {
    fn new() -> Self {
        Self {
            hits: counter("dashboard_cache_hits_total", "Fresh cache reads", &["entity"]),
            misses: counter(
                "dashboard_cache_misses_total",
                "Reads of keys never cached",
                &["entity"],
            ),
            stale_reads: counter(
                "dashboard_cache_stale_reads_total",
                "Reads that found an entry outside its freshness window",
                &["entity"],
            ),
            writes: counter("dashboard_cache_writes_total", "Cache writes", &["entity"]),
            invalidations: counter(
                "dashboard_cache_invalidations_total",
                "Entries marked stale or removed",
                &["entity"],
            ),
            errors: counter(
                "dashboard_cache_errors_total",
                "Cache errors",
                &["entity", "error_type"],
            ),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.hits.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.stale_reads.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.invalidations.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static CacheMetricsInner {
    METRICS.get_or_init(CacheMetricsInner::new)
}

fn entity(key: &str) -> &str {
    CacheKey::entity_type(key).unwrap_or("unknown")
}

/// Cache metrics wrapper
#[derive(Clone, Default, Debug)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_hit(&self, key: &str) {
        get_metrics().hits.with_label_values(&[entity(key)]).inc();
    }

    pub fn record_miss(&self, key: &str) {
        get_metrics().misses.with_label_values(&[entity(key)]).inc();
    }

    pub fn record_stale(&self, key: &str) {
        get_metrics()
            .stale_reads
            .with_label_values(&[entity(key)])
            .inc();
    }

    pub fn record_write(&self, key: &str) {
        get_metrics().writes.with_label_values(&[entity(key)]).inc();
    }

    pub fn record_invalidation(&self, key: &str) {
        get_metrics()
            .invalidations
            .with_label_values(&[entity(key)])
            .inc();
    }

    pub fn record_error(&self, key: &str, error_type: &str) {
        get_metrics()
            .errors
            .with_label_values(&[entity(key), error_type])
            .inc();
    }
}
