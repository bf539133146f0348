//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `app_operator_reconciliations_total` - Reconciliations by primary kind
//! - `app_operator_reconciliation_errors_total` - Failed reconciliations by primary kind
//! - `app_operator_reconciliation_duration_seconds` - Duration of a full workflow run
//! - `app_operator_dependent_operations_total` - Convergence outcomes by dependent and outcome
//! - `app_operator_dependent_operation_duration_seconds` - Duration of one dependent convergence
//! - `app_operator_dependent_errors_total` - Failed dependent convergences by dependent

use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "app_operator_reconciliations_total",
            "Total number of reconciliations by primary kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "app_operator_reconciliation_errors_total",
            "Total number of reconciliation errors by primary kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "app_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds by primary kind",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static DEPENDENT_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "app_operator_dependent_operations_total",
            "Total number of dependent convergences by dependent and outcome",
        ),
        &["dependent", "outcome"],
    )
    .expect("Failed to create DEPENDENT_OPERATIONS_TOTAL metric - this should never happen")
});

static DEPENDENT_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "app_operator_dependent_operation_duration_seconds",
            "Duration of a single dependent convergence in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["dependent"],
    )
    .expect("Failed to create DEPENDENT_OPERATION_DURATION metric - this should never happen")
});

static DEPENDENT_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "app_operator_dependent_errors_total",
            "Total number of failed dependent convergences by dependent",
        ),
        &["dependent"],
    )
    .expect("Failed to create DEPENDENT_ERRORS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(DEPENDENT_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEPENDENT_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(DEPENDENT_ERRORS_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

/// Record the outcome and duration of one dependent convergence
pub fn record_dependent_operation(dependent: &str, outcome: &str, duration: f64) {
    DEPENDENT_OPERATIONS_TOTAL
        .with_label_values(&[dependent, outcome])
        .inc();
    DEPENDENT_OPERATION_DURATION
        .with_label_values(&[dependent])
        .observe(duration);
}

pub fn increment_dependent_errors(dependent: &str) {
    DEPENDENT_ERRORS_TOTAL.with_label_values(&[dependent]).inc();
}
