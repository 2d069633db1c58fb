//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the reelsplice server:
//! - HTTP request metrics (latency, counts, in-flight)
//! - Upload volume
//! - Merge capacity (collected dynamically)
//!
//! Core metrics (merge jobs, encoder runs, fetches) are registered from
//! [`reelsplice_core::metrics::all_metrics`].

use once_cell::sync::Lazy;
use prometheus::{
    self, core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "reelsplice_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.005, 0.025, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelsplice_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "reelsplice_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Merge Request Metrics
// =============================================================================

/// Bytes received through multipart uploads.
pub static UPLOAD_BYTES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelsplice_upload_bytes_total",
        "Total bytes received as uploaded videos",
    )
    .unwrap()
});

/// Merge slots free right now (collected dynamically).
pub static MERGE_PERMITS_AVAILABLE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "reelsplice_merge_permits_available",
        "Merges that could start without waiting",
    )
    .unwrap()
});

fn register(registry: &Registry, collector: Box<dyn Collector>) {
    if let Err(e) = registry.register(collector) {
        tracing::warn!(error = %e, "Failed to register metric");
    }
}

/// Register all metrics with the registry.
fn register_metrics(registry: &Registry) {
    // HTTP
    register(registry, Box::new(HTTP_REQUEST_DURATION.clone()));
    register(registry, Box::new(HTTP_REQUESTS_TOTAL.clone()));
    register(registry, Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()));

    // Merge requests
    register(registry, Box::new(UPLOAD_BYTES_TOTAL.clone()));
    register(registry, Box::new(MERGE_PERMITS_AVAILABLE.clone()));

    // Core metrics (jobs, encoder, fetches)
    for metric in reelsplice_core::metrics::all_metrics() {
        register(registry, metric);
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Update gauges that are read from application state rather than
/// maintained incrementally.
pub fn collect_dynamic_metrics(state: &AppState) {
    MERGE_PERMITS_AVAILABLE.set(state.merger().available_permits() as i64);
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if is_numeric(segment) || is_uuid(segment) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn is_uuid(segment: &str) -> bool {
    segment.len() == 36
        && segment.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}
