//! # Error Policy
//!
//! Requeue decisions for failed reconciliations.

use crate::apps::Application;
use crate::controller::reconciler::{resource_key, Context, ReconcilerError};
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Requeue a failed primary with Fibonacci backoff
///
/// Backoff is tracked per primary, so a primary that keeps failing does not
/// delay retries of healthy ones. It is reset by the next successful
/// reconciliation.
pub fn handle_reconciliation_error<A: Application>(
    primary: Arc<A>,
    error: &ReconcilerError,
    ctx: Arc<Context>,
) -> Action {
    let kind = A::kind(&()).to_string();
    let name = primary.name_any();
    let namespace = primary.namespace().unwrap_or_default();

    let _span = tracing::error_span!(
        "controller.reconciliation_error",
        resource.kind = %kind,
        resource.name = %name,
        resource.namespace = %namespace,
    )
    .entered();

    metrics::increment_reconciliation_errors(&kind);
    match error {
        ReconcilerError::Converge(e) if !e.is_transient() => {
            error!("Reconciliation of {} {}/{} failed and needs attention: {}", kind, namespace, name, e);
        }
        _ => {
            warn!("Reconciliation of {} {}/{} failed: {}", kind, namespace, name, error);
        }
    }

    let (delay, error_count) = ctx.backoff.record_failure(&resource_key(primary.as_ref()));
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(60));
    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {}), next attempt at {}",
        delay.as_secs(),
        error_count,
        next_trigger_time.to_rfc3339()
    );

    Action::requeue(delay)
}
