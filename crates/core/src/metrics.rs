//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Merge jobs (outcome, duration, in-flight count)
//! - Encoder invocations
//! - Remote fetches (requests, bytes)
//!
//! Metrics are registered by the server's registry via [`all_metrics`].

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Merge Jobs
// =============================================================================

/// Merge jobs by result.
pub static MERGE_JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelsplice_merge_jobs_total", "Total merge jobs run"),
        &["result"], // "succeeded", "validation", "io", "processing", "timeout", "cancelled"
    )
    .unwrap()
});

/// Merge job duration in seconds.
pub static MERGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "reelsplice_merge_duration_seconds",
            "Duration of the encoder step of a merge job",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 900.0]),
        &["result"],
    )
    .unwrap()
});

/// Merges currently holding a workspace.
pub static MERGES_IN_PROGRESS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "reelsplice_merges_in_progress",
        "Number of merges currently running",
    )
    .unwrap()
});

// =============================================================================
// Encoder
// =============================================================================

/// Encoder process exits by result.
pub static ENCODER_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelsplice_encoder_runs_total",
            "Total encoder subprocess invocations",
        ),
        &["result"], // "success", "failure", "timeout", "cancelled", "spawn_error"
    )
    .unwrap()
});

// =============================================================================
// Remote Fetch
// =============================================================================

/// Remote fetches by result.
pub static FETCH_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelsplice_fetch_requests_total", "Total remote fetches"),
        &["result"], // "success", "rejected", "error"
    )
    .unwrap()
});

/// Bytes written to workspaces by remote fetches.
pub static FETCH_BYTES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelsplice_fetch_bytes_total",
        "Total bytes downloaded from remote inputs",
    )
    .unwrap()
});

/// Returns all core metrics for registration with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Merge jobs
        Box::new(MERGE_JOBS_TOTAL.clone()),
        Box::new(MERGE_DURATION.clone()),
        Box::new(MERGES_IN_PROGRESS.clone()),
        // Encoder
        Box::new(ENCODER_RUNS_TOTAL.clone()),
        // Fetch
        Box::new(FETCH_REQUESTS_TOTAL.clone()),
        Box::new(FETCH_BYTES_TOTAL.clone()),
    ]
}
