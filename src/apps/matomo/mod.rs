//! # Matomo
//!
//! Dependents of a [`Matomo`] primary: environment, credentials, a MariaDB
//! instance with a database account, the Deployment and its Service and
//! Ingress.

mod config;
mod database;
mod deployment;
mod network;

pub use config::{MatomoConfigMap, MatomoSecret};
pub use database::{MatomoDatabase, MatomoDatabaseUser};
pub use deployment::MatomoDeployment;
pub use network::{MatomoIngress, MatomoService};

use super::{Application, WorkflowReport};
use crate::crd::{AppStatus, Matomo};
use crate::dependent::{ConvergeError, ConvergenceEngine};
use crate::store::StateStore;
use async_trait::async_trait;

pub const APP_NAME: &str = "matomo";
pub const IMAGE: &str = "glasskube/matomo:4.13.3";
pub const HTTP_PORT: i32 = 80;

#[async_trait]
impl Application for Matomo {
    const APP_NAME: &'static str = APP_NAME;

    fn status(&self) -> Option<&AppStatus> {
        self.status.as_ref()
    }

    async fn converge<S: StateStore>(
        &self,
        engine: &ConvergenceEngine<S>,
    ) -> Result<WorkflowReport, ConvergeError> {
        let mut report = WorkflowReport::new();
        report.step(engine, self, &MatomoConfigMap).await?;
        report.step(engine, self, &MatomoSecret).await?;
        report.step(engine, self, &MatomoDatabase).await?;
        report.step(engine, self, &MatomoDatabaseUser).await?;
        report.step(engine, self, &MatomoDeployment).await?;
        report.step(engine, self, &MatomoService).await?;
        report.step(engine, self, &MatomoIngress).await?;
        Ok(report)
    }
}
