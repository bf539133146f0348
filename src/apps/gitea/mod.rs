//! # Gitea
//!
//! Dependents of a [`Gitea`] primary, converged in this order:
//!
//! 1. environment ConfigMap and generated Secret
//! 2. repository volume and PostgreSQL cluster
//! 3. Deployment
//! 4. HTTP and SSH Services (one dependent kind, two [`ServiceRole`]s)
//! 5. Ingress

mod config;
mod deployment;
mod network;
mod storage;

pub use config::{GiteaConfigMap, GiteaSecret, INTERNAL_TOKEN, SECRET_KEY};
pub use deployment::GiteaDeployment;
pub use network::{GiteaIngress, GiteaService, ServiceRole};
pub use storage::{GiteaDatabase, GiteaVolume};

use super::{Application, WorkflowReport};
use crate::crd::{AppStatus, Gitea};
use crate::dependent::{ConvergeError, ConvergenceEngine};
use crate::store::StateStore;
use async_trait::async_trait;

pub const APP_NAME: &str = "gitea";
pub const APP_VERSION: &str = "1.19.3";
pub const IMAGE: &str = "gitea/gitea:1.19.3";

/// Gitea's data directory inside every container
pub const WORK_DIR: &str = "/data";

pub const HTTP_PORT: i32 = 3000;
pub const SSH_PORT: i32 = 22;

#[async_trait]
impl Application for Gitea {
    const APP_NAME: &'static str = APP_NAME;

    fn status(&self) -> Option<&AppStatus> {
        self.status.as_ref()
    }

    async fn converge<S: StateStore>(
        &self,
        engine: &ConvergenceEngine<S>,
    ) -> Result<WorkflowReport, ConvergeError> {
        let mut report = WorkflowReport::new();
        report.step(engine, self, &GiteaConfigMap).await?;
        report.step(engine, self, &GiteaSecret).await?;
        report.step(engine, self, &GiteaVolume).await?;
        report.step(engine, self, &GiteaDatabase).await?;
        report.step(engine, self, &GiteaDeployment).await?;
        for role in ServiceRole::ALL {
            report.step(engine, self, &GiteaService(role)).await?;
        }
        report.step(engine, self, &GiteaIngress).await?;
        Ok(report)
    }
}
