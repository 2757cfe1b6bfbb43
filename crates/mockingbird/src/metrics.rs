//! Prometheus metrics for the mock server.
//!
//! Tracks served requests, their latency, and listener start attempts.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Total number of requests answered by the mock listener
    pub static ref MOCK_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "mockingbird_requests_total",
        "Total number of requests answered by the mock server",
        &["method", "status", "matched"]
    )
    .expect("mockingbird_requests_total registers once");

    /// End-to-end handling time, including configured delays
    pub static ref MOCK_REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "mockingbird_request_duration_ms",
        "Histogram of request handling time in milliseconds",
        &["matched"],
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .expect("mockingbird_request_duration_ms registers once");

    /// Listener start attempts
    pub static ref SERVER_STARTS_TOTAL: CounterVec = register_counter_vec!(
        "mockingbird_server_starts_total",
        "Total number of mock server start attempts",
        &["result"]  // result: success|failure
    )
    .expect("mockingbird_server_starts_total registers once");
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record a handled request
pub fn record_request(method: &str, status: u16, matched: bool, duration_ms: u64) {
    let matched = if matched { "true" } else { "false" };
    MOCK_REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string(), matched])
        .inc();
    MOCK_REQUEST_DURATION_MS
        .with_label_values(&[matched])
        .observe(duration_ms as f64);
}

/// Helper to record a start attempt
pub fn record_start(success: bool) {
    SERVER_STARTS_TOTAL
        .with_label_values(&[if success { "success" } else { "failure" }])
        .inc();
}
