//! Process metrics definitions.
//!
//! All metrics follow Prometheus naming conventions:
//! - `_total` suffix for counters
//! - `_seconds` suffix for histograms measuring duration

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Register all core metrics with descriptions.
pub fn register_core_metrics() {
    // Collection
    describe_counter!(
        "probemon_probe_runs_total",
        "Total probe runs (by metric, outcome: ok, failed, timeout, not_numeric)"
    );
    describe_histogram!("probemon_probe_duration_seconds", "Probe wall-clock time (by metric)");

    // Storage
    describe_counter!(
        "probemon_storage_tasks_total",
        "Total storage tasks applied (by kind: insert, prune; outcome: ok, error)"
    );

    // Read path
    describe_histogram!(
        "probemon_series_rows",
        "Rows returned per series query (by downsampled: true, false)"
    );
}

pub fn record_probe(metric: &str, outcome: &'static str, elapsed: Duration) {
    counter!("probemon_probe_runs_total", "metric" => metric.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("probemon_probe_duration_seconds", "metric" => metric.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_storage_task(kind: &'static str, outcome: &'static str) {
    counter!("probemon_storage_tasks_total", "kind" => kind, "outcome" => outcome).increment(1);
}

pub fn record_series_rows(rows: usize, downsampled: bool) {
    histogram!("probemon_series_rows", "downsampled" => downsampled.to_string())
        .record(rows as f64);
}
