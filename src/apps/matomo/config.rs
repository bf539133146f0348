//! Matomo environment and bootstrap files.

use super::{MatomoDatabase, MatomoDatabaseUser, APP_NAME};
use crate::apps::labels::resource_labels;
use crate::apps::secret::{generated_secret, GeneratedValues, OPAQUE};
use crate::crd::Matomo;
use crate::dependent::{Collaborators, Dependent};
use crate::settings::ConfigError;
use crate::store::{ResourceIdentity, StateStore};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

pub const DATABASE_PASSWORD: &str = "MATOMO_DATABASE_PASSWORD";
pub const ROOT_PASSWORD: &str = "MARIADB_ROOT_PASSWORD";

pub const INSTALL_JSON: &str = "install.json";
pub const INIT_SH: &str = "init.sh";
pub const ARCHIVE_CRON: &str = "matomo-archive-cron";

const INIT_SCRIPT: &str = r#"set -e
if [ ! -f /var/www/html/config/config.ini.php ]; then
  cp /tmp/matomo/install.json /var/www/html/install.json
  php /var/www/html/console plugin:activate ExtraTools
  php /var/www/html/console matomo:install --install-file=/var/www/html/install.json --force
fi
php /var/www/html/console core:update --yes
"#;

const ARCHIVE_SCHEDULE: &str =
    "5 * * * * www-data /usr/local/bin/php /var/www/html/console core:archive > /proc/1/fd/1 2>&1\n";

#[derive(Debug, Clone, Copy)]
pub struct MatomoConfigMap;

impl Dependent<Matomo> for MatomoConfigMap {
    const NAME: &'static str = "matomo-configmap";
    type Resource = ConfigMap;
    type Inputs = ();

    fn identity(&self, primary: &Matomo) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "matomo-config")
    }

    fn desired(&self, primary: &Matomo, _inputs: ()) -> ConfigMap {
        let install = serde_json::json!({
            "Config": {
                "General": {
                    "trusted_hosts[]": primary.spec.host,
                }
            },
            "FirstSite": {
                "siteName": primary.spec.host,
                "url": format!("https://{}/", primary.spec.host),
            }
        });
        let data = [
            ("MATOMO_DATABASE_HOST", MatomoDatabase.identity(primary).name),
            ("MATOMO_DATABASE_ADAPTER", "mysql".to_string()),
            ("MATOMO_DATABASE_TABLES_PREFIX", "matomo_".to_string()),
            ("MATOMO_DATABASE_USERNAME", MatomoDatabaseUser.identity(primary).name),
            ("MATOMO_DATABASE_DBNAME", "matomo".to_string()),
            (INSTALL_JSON, install.to_string()),
            (INIT_SH, INIT_SCRIPT.to_string()),
            (ARCHIVE_CRON, ARCHIVE_SCHEDULE.to_string()),
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
pub struct MatomoSecret;

#[async_trait]
impl Dependent<Matomo> for MatomoSecret {
    const NAME: &'static str = "matomo-secret";
    type Resource = Secret;
    type Inputs = GeneratedValues;

    fn identity(&self, primary: &Matomo) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "matomo-secret")
    }

    async fn collect<S: StateStore>(
        &self,
        _primary: &Matomo,
        observed: Option<&Secret>,
        _collaborators: &Collaborators<'_, S>,
    ) -> Result<GeneratedValues, ConfigError> {
        Ok(GeneratedValues::retain_or_generate(
            observed,
            &[DATABASE_PASSWORD, ROOT_PASSWORD],
        ))
    }

    fn desired(&self, primary: &Matomo, inputs: GeneratedValues) -> Secret {
        generated_secret(
            resource_labels(APP_NAME, primary),
            OPAQUE,
            inputs,
            BTreeMap::new(),
        )
    }
}
