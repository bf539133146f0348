//! # Applications
//!
//! Concrete dependents for each primary kind, and the workflow that
//! converges them in order.
//!
//! - `gitea` - Gitea with a CloudNativePG database
//! - `matomo` - Matomo with a MariaDB database
//! - `minio` - MinIO bucket credentials
//! - `labels`, `secret`, `network`, `storage` - building blocks shared by the apps

pub mod gitea;
pub mod labels;
pub mod matomo;
pub mod minio;
pub mod network;
pub mod secret;
pub mod storage;

use crate::crd::AppStatus;
use crate::dependent::{ConvergeError, ConvergenceEngine, Dependent, Outcome};
use crate::store::{NamespacedResource, StateStore};
use async_trait::async_trait;

/// A primary kind and the dependents derived from it
#[async_trait]
pub trait Application: NamespacedResource {
    /// Value of `app.kubernetes.io/name` on every dependent
    const APP_NAME: &'static str;

    /// Status last written back to the primary
    fn status(&self) -> Option<&AppStatus>;

    /// Converge every dependent of `self`, in dependency order
    ///
    /// Stops at the first failing dependent; later dependents are retried
    /// with the next cycle.
    async fn converge<S: StateStore>(
        &self,
        engine: &ConvergenceEngine<S>,
    ) -> Result<WorkflowReport, ConvergeError>;
}

/// Outcome of every dependent converged in one workflow run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowReport {
    steps: Vec<(&'static str, Outcome)>,
}

impl WorkflowReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converge `dependent` for `primary` and record the outcome
    pub async fn step<S, P, D>(
        &mut self,
        engine: &ConvergenceEngine<S>,
        primary: &P,
        dependent: &D,
    ) -> Result<Outcome, ConvergeError>
    where
        S: StateStore,
        P: NamespacedResource,
        D: Dependent<P>,
    {
        let outcome = engine.reconcile(primary, dependent).await?;
        self.steps.push((dependent.name(), outcome));
        Ok(outcome)
    }

    pub fn steps(&self) -> &[(&'static str, Outcome)] {
        &self.steps
    }

    /// Outcome recorded for the dependent named `name`
    pub fn outcome_of(&self, name: &str) -> Option<Outcome> {
        self.steps
            .iter()
            .find(|(step, _)| *step == name)
            .map(|(_, outcome)| *outcome)
    }

    /// Number of dependents that were created or updated
    pub fn mutations(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, outcome)| outcome.is_mutation())
            .count()
    }
}
