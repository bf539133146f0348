//! MariaDB instance and Matomo's database account on it.

use super::{MatomoSecret, APP_NAME};
use super::config::{DATABASE_PASSWORD, ROOT_PASSWORD};
use crate::apps::labels::resource_labels;
use crate::apps::storage::{resolve_storage_class, size_or, StorageInputs};
use crate::crd::{
    DatabaseRef, MariaDB, MariaDBImage, MariaDBSpec, MariaDBUser, MariaDBVolumeClaimTemplate,
    Matomo, SecretKeySelector, UserSpec,
};
use crate::dependent::{Collaborators, Dependent};
use crate::settings::ConfigError;
use crate::store::{ResourceIdentity, StateStore};
use async_trait::async_trait;

const MARIADB_REPOSITORY: &str = "mariadb";
const MARIADB_TAG: &str = "10.7.4";
const DEFAULT_DATABASE_SIZE: &str = "10Gi";

#[derive(Debug, Clone, Copy)]
pub struct MatomoDatabase;

#[async_trait]
impl Dependent<Matomo> for MatomoDatabase {
    const NAME: &'static str = "matomo-mariadb";
    type Resource = MariaDB;
    type Inputs = StorageInputs;

    fn identity(&self, primary: &Matomo) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "matomo-mariadb")
    }

    async fn collect<S: StateStore>(
        &self,
        primary: &Matomo,
        _observed: Option<&MariaDB>,
        collaborators: &Collaborators<'_, S>,
    ) -> Result<StorageInputs, ConfigError> {
        resolve_storage_class(primary.spec.storage.as_ref(), collaborators).await
    }

    fn desired(&self, primary: &Matomo, inputs: StorageInputs) -> MariaDB {
        let mut mariadb = MariaDB::new(
            &self.identity(primary).name,
            MariaDBSpec {
                root_password_secret_key_ref: SecretKeySelector {
                    name: MatomoSecret.identity(primary).name,
                    key: ROOT_PASSWORD.to_string(),
                },
                image: MariaDBImage {
                    repository: MARIADB_REPOSITORY.to_string(),
                    tag: MARIADB_TAG.to_string(),
                    pull_policy: Some("IfNotPresent".to_string()),
                },
                port: 3306,
                volume_claim_template: MariaDBVolumeClaimTemplate::new(
                    size_or(primary.spec.storage.as_ref(), DEFAULT_DATABASE_SIZE),
                    inputs.storage_class.as_deref(),
                ),
                metrics: None,
            },
        );
        mariadb.metadata.labels = Some(resource_labels(APP_NAME, primary));
        mariadb
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MatomoDatabaseUser;

impl Dependent<Matomo> for MatomoDatabaseUser {
    const NAME: &'static str = "matomo-mariadb-user";
    type Resource = MariaDBUser;
    type Inputs = ();

    fn identity(&self, primary: &Matomo) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "matomo")
    }

    fn desired(&self, primary: &Matomo, _inputs: ()) -> MariaDBUser {
        let mut user = MariaDBUser::new(
            &self.identity(primary).name,
            UserSpec {
                maria_db_ref: DatabaseRef {
                    name: MatomoDatabase.identity(primary).name,
                },
                password_secret_key_ref: SecretKeySelector {
                    name: MatomoSecret.identity(primary).name,
                    key: DATABASE_PASSWORD.to_string(),
                },
                max_user_connections: None,
            },
        );
        user.metadata.labels = Some(resource_labels(APP_NAME, primary));
        user
    }
}
