//! Prometheus metrics for collection fetches and dashboard refresh cycles

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;

static METRICS: OnceLock<DashboardMetrics> = OnceLock::new();

struct DashboardMetrics {
    fetches: CounterVec,
    fetch_duration: HistogramVec,
    refresh_cycles: CounterVec,
    views_generation: IntGauge,
}

impl DashboardMetrics {
    fn new() -> Self {
        Self {
            fetches: CounterVec::new(
                Opts::new("dashboard_fetch_total", "Collection fetches by outcome"),
                &["collection", "outcome"],
            )
            .expect("valid metric definition"),
            fetch_duration: HistogramVec::new(
                HistogramOpts::new(
                    "dashboard_fetch_duration_seconds",
                    "Collection fetch latency including retries",
                )
                .buckets(vec![0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 10.0, 30.0]),
                &["collection"],
            )
            .expect("valid metric definition"),
            refresh_cycles: CounterVec::new(
                Opts::new("dashboard_refresh_cycles_total", "Dashboard refresh cycles"),
                &["trigger", "outcome"],
            )
            .expect("valid metric definition"),
            views_generation: IntGauge::new(
                "dashboard_views_generation",
                "Generation of the most recently published views",
            )
            .expect("valid metric definition"),
        }
    }
}

fn get_metrics() -> &'static DashboardMetrics {
    METRICS.get_or_init(DashboardMetrics::new)
}

/// Register service metrics with a Prometheus registry
pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
    let m = get_metrics();
    registry.register(Box::new(m.fetches.clone()))?;
    registry.register(Box::new(m.fetch_duration.clone()))?;
    registry.register(Box::new(m.refresh_cycles.clone()))?;
    registry.register(Box::new(m.views_generation.clone()))?;
    Ok(())
}

pub fn record_fetch(collection: &str, success: bool, elapsed: Duration) {
    let m = get_metrics();
    let outcome = if success { "success" } else { "failure" };
    m.fetches.with_label_values(&[collection, outcome]).inc();
    m.fetch_duration
        .with_label_values(&[collection])
        .observe(elapsed.as_secs_f64());
}

pub fn record_refresh_cycle(trigger: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    get_metrics()
        .refresh_cycles
        .with_label_values(&[trigger, outcome])
        .inc();
}

pub fn set_views_generation(generation: u64) {
    get_metrics()
        .views_generation
        .set(i64::try_from(generation).unwrap_or(i64::MAX));
}

/// Render a registry in the Prometheus text exposition format
pub fn render(registry: &Registry) -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&registry.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
