//! Thin wrapper around the `prometheus` crate.
//!
//! Mirrors the shape of Lighthouse's own `lighthouse_metrics`: every
//! constructor returns a `Result` so that a duplicate-registration error
//! (which can happen under test re-compilation or double-init) is a value
//! callers can log and ignore rather than a panic.

pub use prometheus::{
    Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Result,
};

use prometheus::core::{AtomicF64, GenericGauge};
use prometheus::{linear_buckets, Registry};

pub type Float64Gauge = GenericGauge<AtomicF64>;

lazy_static::lazy_static! {
    static ref DEFAULT_REGISTRY: Registry = Registry::new();
}

/// Returns the registry every `try_create_*` helper registers into, for use
/// by the `/metrics` HTTP handler.
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

pub fn try_create_int_counter(name: &str, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::new(name, help)?;
    DEFAULT_REGISTRY.register(Box::new(counter.clone()))?;
    Ok(counter)
}

pub fn try_create_int_counter_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntCounterVec> {
    let opts = Opts::new(name, help);
    let counter_vec = IntCounterVec::new(opts, label_names)?;
    DEFAULT_REGISTRY.register(Box::new(counter_vec.clone()))?;
    Ok(counter_vec)
}

pub fn try_create_int_gauge(name: &str, help: &str) -> Result<IntGauge> {
    let gauge = IntGauge::new(name, help)?;
    DEFAULT_REGISTRY.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

pub fn try_create_int_gauge_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntGaugeVec> {
    let opts = Opts::new(name, help);
    let gauge_vec = IntGaugeVec::new(opts, label_names)?;
    DEFAULT_REGISTRY.register(Box::new(gauge_vec.clone()))?;
    Ok(gauge_vec)
}

pub fn try_create_float_gauge(name: &str, help: &str) -> Result<Gauge> {
    let gauge = Gauge::new(name, help)?;
    DEFAULT_REGISTRY.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

pub fn try_create_histogram(name: &str, help: &str) -> Result<Histogram> {
    let opts = HistogramOpts::new(name, help);
    let histogram = Histogram::with_opts(opts)?;
    DEFAULT_REGISTRY.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

/// Linear buckets 0..12000ms in 1000ms steps, as required for the
/// `proposer_delay` histogram.
pub fn try_create_histogram_with_buckets(
    name: &str,
    help: &str,
    buckets: Vec<f64>,
) -> Result<Histogram> {
    let opts = HistogramOpts::new(name, help).buckets(buckets);
    let histogram = Histogram::with_opts(opts)?;
    DEFAULT_REGISTRY.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

pub fn try_create_histogram_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<HistogramVec> {
    let opts = HistogramOpts::new(name, help);
    let histogram_vec = HistogramVec::new(opts, label_names)?;
    DEFAULT_REGISTRY.register(Box::new(histogram_vec.clone()))?;
    Ok(histogram_vec)
}

pub fn proposer_delay_buckets() -> Vec<f64> {
    linear_buckets(0.0, 1000.0, 13).expect("static bucket params are valid")
}

pub fn inc_counter(counter: &Result<IntCounter>) {
    if let Ok(counter) = counter.as_ref() {
        counter.inc();
    }
}

pub fn inc_counter_vec(counter: &Result<IntCounterVec>, label_values: &[&str]) {
    if let Ok(counter) = counter.as_ref() {
        counter.with_label_values(label_values).inc();
    }
}

pub fn set_gauge(gauge: &Result<IntGauge>, value: i64) {
    if let Ok(gauge) = gauge.as_ref() {
        gauge.set(value);
    }
}

pub fn set_gauge_vec(gauge: &Result<IntGaugeVec>, label_values: &[&str], value: i64) {
    if let Ok(gauge) = gauge.as_ref() {
        gauge.with_label_values(label_values).set(value);
    }
}

pub fn set_float_gauge(gauge: &Result<Gauge>, value: f64) {
    if let Ok(gauge) = gauge.as_ref() {
        gauge.set(value);
    }
}

pub fn observe_histogram(histogram: &Result<Histogram>, value: f64) {
    if let Ok(histogram) = histogram.as_ref() {
        histogram.observe(value);
    }
}

pub fn observe_histogram_vec(histogram: &Result<HistogramVec>, label_values: &[&str], value: f64) {
    if let Ok(histogram) = histogram.as_ref() {
        histogram.with_label_values(label_values).observe(value);
    }
}

/// Renders every metric in the default registry as Prometheus text format.
pub fn gather_text() -> String {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = DEFAULT_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .unwrap_or_else(|e| eprintln!("failed to encode metrics: {:?}", e));
    String::from_utf8(buffer).unwrap_or_default()
}
