//! # Reconciler
//!
//! Entry point invoked by the controller runtime for every primary event.
//!
//! A reconciliation:
//! 1. Converges every dependent of the primary through its application workflow
//! 2. Writes status back when the generation moved or a dependent changed
//! 3. Clears the primary's failure backoff and requeues it for the next resync
//!
//! Failures are handed to [`crate::runtime::error_policy`], which requeues
//! with Fibonacci backoff.

use crate::apps::Application;
use crate::config::ControllerConfig;
use crate::controller::backoff::BackoffTracker;
use crate::controller::status::{needs_status_update, patch_status, reconciled_status};
use crate::dependent::{ConvergeError, ConvergenceEngine};
use crate::observability::metrics;
use crate::store::KubeStore;
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, Instrument};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Failed to converge dependents: {0}")]
    Converge(#[from] ConvergeError),

    #[error("Failed to update status: {0}")]
    Status(#[source] kube::Error),
}

/// Shared state handed to every reconciliation
#[derive(Debug)]
pub struct Context {
    pub engine: ConvergenceEngine<KubeStore>,
    pub config: ControllerConfig,
    pub backoff: BackoffTracker,
}

impl Context {
    pub fn new(engine: ConvergenceEngine<KubeStore>, config: ControllerConfig) -> Self {
        let backoff = BackoffTracker::new(config.backoff_min_minutes, config.backoff_max_minutes);
        Self {
            engine,
            config,
            backoff,
        }
    }

    pub fn client(&self) -> &Client {
        self.engine.store().client()
    }
}

/// Key identifying a primary across kinds, e.g. `Gitea/tools/git`
pub fn resource_key<A: Application>(primary: &A) -> String {
    format!(
        "{}/{}/{}",
        A::kind(&()),
        primary.namespace().unwrap_or_default(),
        primary.name_any()
    )
}

pub async fn reconcile<A: Application>(
    primary: Arc<A>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcilerError> {
    let kind = A::kind(&()).to_string();
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.kind = %kind,
        resource.name = %primary.name_any(),
        resource.namespace = %primary.namespace().unwrap_or_default(),
    );

    async move {
        metrics::increment_reconciliations(&kind);
        let start = Instant::now();

        let report = primary.converge(&ctx.engine).await?;
        debug!("Converged {} dependents", report.steps().len());

        let generation = primary.meta().generation;
        if needs_status_update(primary.status(), generation, report.mutations()) {
            patch_status(ctx.client(), primary.as_ref(), &reconciled_status(generation))
                .await
                .map_err(ReconcilerError::Status)?;
        }

        if ctx.backoff.reset(&resource_key(primary.as_ref())) {
            info!("Recovered after previous failures, backoff reset");
        }

        metrics::observe_reconciliation_duration(&kind, start.elapsed().as_secs_f64());
        info!(
            mutations = report.mutations(),
            "Reconciliation complete, next resync in {}s",
            ctx.config.resync_interval_secs
        );
        Ok(Action::requeue(ctx.config.resync_interval()))
    }
    .instrument(span)
    .await
}
