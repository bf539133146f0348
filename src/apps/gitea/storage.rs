//! Gitea repository volume and its PostgreSQL cluster.

use super::APP_NAME;
use crate::apps::labels::resource_labels;
use crate::apps::storage::{persistent_volume_claim, resolve_storage_class, size_or, StorageInputs};
use crate::crd::{
    BootstrapConfiguration, BootstrapInitDB, ClusterSpec, Gitea, PostgresCluster,
    StorageConfiguration,
};
use crate::dependent::{Collaborators, Dependent};
use crate::settings::ConfigError;
use crate::store::{ResourceIdentity, StateStore};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;

const DEFAULT_VOLUME_SIZE: &str = "20Gi";
const DATABASE_SIZE: &str = "10Gi";

#[derive(Debug, Clone, Copy)]
pub struct GiteaVolume;

#[async_trait]
impl Dependent<Gitea> for GiteaVolume {
    const NAME: &'static str = "gitea-volume";
    type Resource = PersistentVolumeClaim;
    type Inputs = StorageInputs;

    fn identity(&self, primary: &Gitea) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "gitea-data")
    }

    async fn collect<S: StateStore>(
        &self,
        primary: &Gitea,
        _observed: Option<&PersistentVolumeClaim>,
        collaborators: &Collaborators<'_, S>,
    ) -> Result<StorageInputs, ConfigError> {
        resolve_storage_class(primary.spec.storage.as_ref(), collaborators).await
    }

    fn desired(&self, primary: &Gitea, inputs: StorageInputs) -> PersistentVolumeClaim {
        persistent_volume_claim(
            resource_labels(APP_NAME, primary),
            size_or(primary.spec.storage.as_ref(), DEFAULT_VOLUME_SIZE),
            inputs.storage_class,
        )
    }
}

/// Single-instance CloudNativePG cluster owning the `gitea` database
///
/// The database operator generates the application credentials into
/// `<cluster>-app`.
#[derive(Debug, Clone, Copy)]
pub struct GiteaDatabase;

impl GiteaDatabase {
    /// Secret the database operator writes the application credentials to
    pub fn app_secret_name(&self, primary: &Gitea) -> String {
        format!("{}-app", self.identity(primary).name)
    }
}

#[async_trait]
impl Dependent<Gitea> for GiteaDatabase {
    const NAME: &'static str = "gitea-database";
    type Resource = PostgresCluster;
    type Inputs = StorageInputs;

    fn identity(&self, primary: &Gitea) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "gitea-db")
    }

    async fn collect<S: StateStore>(
        &self,
        primary: &Gitea,
        _observed: Option<&PostgresCluster>,
        collaborators: &Collaborators<'_, S>,
    ) -> Result<StorageInputs, ConfigError> {
        resolve_storage_class(primary.spec.storage.as_ref(), collaborators).await
    }

    fn desired(&self, primary: &Gitea, inputs: StorageInputs) -> PostgresCluster {
        let mut cluster = PostgresCluster::new(
            &self.identity(primary).name,
            ClusterSpec {
                instances: 1,
                bootstrap: Some(BootstrapConfiguration {
                    initdb: Some(BootstrapInitDB {
                        database: "gitea".to_string(),
                        owner: Some("gitea".to_string()),
                        ..BootstrapInitDB::default()
                    }),
                }),
                storage: StorageConfiguration {
                    size: DATABASE_SIZE.to_string(),
                    storage_class: inputs.storage_class,
                },
            },
        );
        cluster.metadata.labels = Some(resource_labels(APP_NAME, primary));
        cluster
    }
}
