//! Gitea environment: a ConfigMap of `GITEA__section__KEY` variables and a
//! Secret with generated security tokens.

use super::{GiteaDatabase, APP_NAME, HTTP_PORT, SSH_PORT};
use crate::apps::labels::resource_labels;
use crate::apps::secret::{generated_secret, GeneratedValues, OPAQUE};
use crate::crd::Gitea;
use crate::dependent::{Collaborators, Dependent};
use crate::settings::ConfigError;
use crate::store::{ResourceIdentity, StateStore};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

pub const SECRET_KEY: &str = "GITEA__security__SECRET_KEY";
pub const INTERNAL_TOKEN: &str = "GITEA__security__INTERNAL_TOKEN";

#[derive(Debug, Clone, Copy)]
pub struct GiteaConfigMap;

impl Dependent<Gitea> for GiteaConfigMap {
    const NAME: &'static str = "gitea-configmap";
    type Resource = ConfigMap;
    type Inputs = ();

    fn identity(&self, primary: &Gitea) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "gitea-config")
    }

    fn desired(&self, primary: &Gitea, _inputs: ()) -> ConfigMap {
        let host = &primary.spec.host;
        let database_host = format!("{}-rw:5432", GiteaDatabase.identity(primary).name);
        let data = [
            ("GITEA__server__DOMAIN", host.clone()),
            ("GITEA__server__ROOT_URL", format!("https://{host}/")),
            ("GITEA__server__SSH_DOMAIN", host.clone()),
            ("GITEA__server__HTTP_PORT", HTTP_PORT.to_string()),
            ("GITEA__server__SSH_PORT", SSH_PORT.to_string()),
            ("GITEA__database__DB_TYPE", "postgres".to_string()),
            ("GITEA__database__HOST", database_host),
            ("GITEA__database__NAME", "gitea".to_string()),
            ("GITEA__security__INSTALL_LOCK", "true".to_string()),
            ("GITEA__service__DISABLE_REGISTRATION", "true".to_string()),
            ("USER_UID", "1000".to_string()),
            ("USER_GID", "1000".to_string()),
        ];
        ConfigMap {
            metadata: ObjectMeta {
                labels: Some(resource_labels(APP_NAME, primary)),
                ..ObjectMeta::default()
            },
            data: Some(
                data.into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..ConfigMap::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GiteaSecret;

#[async_trait]
impl Dependent<Gitea> for GiteaSecret {
    const NAME: &'static str = "gitea-secret";
    type Resource = Secret;
    type Inputs = GeneratedValues;

    fn identity(&self, primary: &Gitea) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "gitea-secret")
    }

    async fn collect<S: StateStore>(
        &self,
        _primary: &Gitea,
        observed: Option<&Secret>,
        _collaborators: &Collaborators<'_, S>,
    ) -> Result<GeneratedValues, ConfigError> {
        Ok(GeneratedValues::retain_or_generate(
            observed,
            &[SECRET_KEY, INTERNAL_TOKEN],
        ))
    }

    fn desired(&self, primary: &Gitea, inputs: GeneratedValues) -> Secret {
        generated_secret(
            resource_labels(APP_NAME, primary),
            OPAQUE,
            inputs,
            BTreeMap::new(),
        )
    }
}
