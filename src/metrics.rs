// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the ingress controller.
//!
//! All metrics carry the `haproxy_ingress` prefix and live in
//! [`METRICS_REGISTRY`], which the binary exposes on `/metrics`.
//!
//! # Metrics Categories
//!
//! - **Status Metrics** - Ingress status passes and per-Ingress outcomes
//! - **TCP Services Metrics** - Backends synthesised and entries skipped
//! - **Annotation Metrics** - Annotation parse failures by feature
//! - **Leader Election Metrics** - Leadership state changes

use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "haproxy_ingress";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Status Metrics
// ============================================================================

/// Per-Ingress status update outcomes
///
/// Labels:
/// - `outcome`: `updated`, `skipped` (no change) or `failed`
pub static STATUS_UPDATES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_status_updates_total"),
        "Total number of Ingress status updates by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of status sync passes in seconds
///
/// Labels:
/// - `result`: `success` or `error`
pub static STATUS_SYNC_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_status_sync_duration_seconds"),
        "Duration of Ingress status sync passes in seconds",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// TCP Services Metrics
// ============================================================================

/// Number of TCP backends produced by the last sync pass
pub static TCP_BACKENDS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_tcp_backends"),
        "Number of TCP backends produced by the last sync pass",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// TCP services table entries skipped
///
/// Labels:
/// - `reason`: e.g. `service_not_found`, `port_not_found`
pub static TCP_SKIPPED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_tcp_skipped_total"),
        "Total number of TCP services entries skipped by reason",
    );
    let counter = CounterVec::new(opts, &["reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Annotation Metrics
// ============================================================================

/// Annotation parse failures
///
/// Labels:
/// - `feature`: annotation feature name, e.g. `cors`
pub static ANNOTATION_ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_annotation_errors_total"),
        "Total number of annotation parse failures by feature",
    );
    let counter = CounterVec::new(opts, &["feature"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Leader Election Metrics
// ============================================================================

/// Leader election transitions
///
/// Labels:
/// - `status`: `acquired` or `lost`
pub static LEADER_ELECTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_leader_elections_total"),
        "Total number of leader election events by status",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// 1 while this process is the status update leader, 0 otherwise
pub static LEADER_STATUS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_leader_status"),
        "Current leader election status (1 = leader, 0 = follower)",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record the outcome of one Ingress status update
pub fn record_status_update(outcome: &str) {
    STATUS_UPDATES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a finished status sync pass
pub fn record_status_sync(success: bool, duration: Duration) {
    let result = if success { "success" } else { "error" };
    STATUS_SYNC_DURATION_SECONDS
        .with_label_values(&[result])
        .observe(duration.as_secs_f64());
}

/// Record the size of the backend set produced by a TCP sync pass
#[allow(clippy::cast_precision_loss)]
pub fn record_tcp_backends(count: usize) {
    TCP_BACKENDS.set(count as f64);
}

/// Record a skipped TCP services entry
pub fn record_tcp_skip(reason: &str) {
    TCP_SKIPPED_TOTAL.with_label_values(&[reason]).inc();
}

/// Record an annotation parse failure
pub fn record_annotation_error(feature: &str) {
    ANNOTATION_ERRORS_TOTAL.with_label_values(&[feature]).inc();
}

/// Record a leadership transition
pub fn set_leader_status(leading: bool) {
    if leading {
        LEADER_ELECTIONS_TOTAL
            .with_label_values(&["acquired"])
            .inc();
        LEADER_STATUS.set(1.0);
    } else {
        LEADER_ELECTIONS_TOTAL.with_label_values(&["lost"]).inc();
        LEADER_STATUS.set(0.0);
    }
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_status_update() {
        record_status_update("updated");

        let counter = STATUS_UPDATES_TOTAL.with_label_values(&["updated"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_status_sync() {
        record_status_sync(false, Duration::from_millis(250));

        let histogram = STATUS_SYNC_DURATION_SECONDS.with_label_values(&["error"]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_tcp_skip() {
        record_tcp_skip("test_reason");

        let counter = TCP_SKIPPED_TOTAL.with_label_values(&["test_reason"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_gather_metrics() {
        record_annotation_error("gather-test");

        let metrics_text = gather_metrics().unwrap();
        assert!(
            metrics_text.contains("haproxy_ingress"),
            "Metrics should contain namespace prefix"
        );
        assert!(
            metrics_text.contains("annotation_errors_total"),
            "Metrics should contain annotation error counter"
        );
    }
}
