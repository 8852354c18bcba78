//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `grafana_operator_reconciliations_total{controller}` - Total number of reconciliations
//! - `grafana_operator_reconciliation_errors_total{controller,reason}` - Total number of reconciliation errors
//! - `grafana_operator_reconciliation_duration_seconds{controller}` - Duration of reconciliation operations
//! - `grafana_operator_stage_operations_total{stage,verb}` - Mutations issued by the instance stages
//! - `grafana_operator_grafana_api_calls_total{operation,outcome}` - Calls to the Grafana HTTP API
//! - `grafana_operator_grafana_api_duration_seconds{operation}` - Duration of Grafana API calls
//! - `grafana_operator_requeues_total{reason}` - Requeues scheduled by the controllers

use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "grafana_operator_reconciliations_total",
            "Total number of reconciliations",
        ),
        &["controller"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "grafana_operator_reconciliation_errors_total",
            "Total number of reconciliation errors",
        ),
        &["controller", "reason"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "grafana_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["controller"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static STAGE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "grafana_operator_stage_operations_total",
            "Total number of create/update calls issued by the GrafanaInstance stages",
        ),
        &["stage", "verb"],
    )
    .expect("Failed to create STAGE_OPERATIONS_TOTAL metric - this should never happen")
});

static GRAFANA_API_CALLS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "grafana_operator_grafana_api_calls_total",
            "Total number of Grafana HTTP API calls",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create GRAFANA_API_CALLS_TOTAL metric - this should never happen")
});

static GRAFANA_API_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "grafana_operator_grafana_api_duration_seconds",
            "Duration of Grafana HTTP API calls in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["operation"],
    )
    .expect("Failed to create GRAFANA_API_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "grafana_operator_requeues_total",
            "Total number of requeues scheduled by the controllers",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register all metrics with the shared registry
///
/// # Errors
///
/// Fails when a metric is registered twice.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(STAGE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GRAFANA_API_CALLS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GRAFANA_API_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(controller: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[controller]).inc();
}

pub fn increment_reconciliation_errors(controller: &str, reason: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[controller, reason])
        .inc();
}

pub fn observe_reconciliation_duration(controller: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[controller])
        .observe(duration);
}

pub fn increment_stage_operations(stage: &str, verb: &str) {
    STAGE_OPERATIONS_TOTAL.with_label_values(&[stage, verb]).inc();
}

pub fn record_grafana_call(operation: &str, outcome: &str, duration: f64) {
    GRAFANA_API_CALLS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    GRAFANA_API_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
