//! # MariaDB Operator Resources
//!
//! Subset of the `mariadb.mmontes.io/v1alpha1` API this operator writes.
//! Only the fields the operator sets are modelled; the owning operator
//! defaults the rest.

use super::SecretKeySelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "MariaDB",
    group = "mariadb.mmontes.io",
    version = "v1alpha1",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MariaDBSpec {
    pub root_password_secret_key_ref: SecretKeySelector,
    pub image: MariaDBImage,
    #[serde(default = "default_port")]
    pub port: i32,
    pub volume_claim_template: MariaDBVolumeClaimTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MariaDBMetrics>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MariaDBImage {
    pub repository: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_policy: Option<String>,
}

/// Quantities as Kubernetes quantity strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct MariaDBResourcesRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct MariaDBResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<MariaDBResourcesRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<MariaDBResourcesRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MariaDBVolumeClaimTemplate {
    pub resources: MariaDBResources,
    #[serde(default = "default_storage_class_name")]
    pub storage_class_name: String,
    #[serde(default = "default_access_modes")]
    pub access_modes: Vec<String>,
}

impl MariaDBVolumeClaimTemplate {
    /// Single-writer claim of `storage` on `storage_class_name`
    pub fn new(storage: impl Into<String>, storage_class_name: Option<&str>) -> Self {
        Self {
            resources: MariaDBResources {
                requests: Some(MariaDBResourcesRequest {
                    storage: Some(storage.into()),
                    ..MariaDBResourcesRequest::default()
                }),
                limits: None,
            },
            storage_class_name: storage_class_name
                .map_or_else(default_storage_class_name, str::to_string),
            access_modes: default_access_modes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MariaDBMetrics {
    pub exporter: MariaDBExporter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_monitor: Option<MariaDBServiceMonitor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct MariaDBExporter {
    pub image: MariaDBImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MariaDBServiceMonitor {
    pub prometheus_release: String,
}

/// Database account on a [`MariaDB`] instance
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "User",
    root = "MariaDBUser",
    group = "mariadb.mmontes.io",
    version = "v1alpha1",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    pub maria_db_ref: DatabaseRef,
    pub password_secret_key_ref: SecretKeySelector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_user_connections: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct DatabaseRef {
    pub name: String,
}

fn default_port() -> i32 {
    3306
}

fn default_storage_class_name() -> String {
    "standard".to_string()
}

fn default_access_modes() -> Vec<String> {
    vec!["ReadWriteOnce".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_claim_template_falls_back_to_standard_class() {
        let template = MariaDBVolumeClaimTemplate::new("10Gi", None);
        assert_eq!(template.storage_class_name, "standard");
        assert_eq!(template.access_modes, vec!["ReadWriteOnce"]);

        let template = MariaDBVolumeClaimTemplate::new("10Gi", Some("gp2"));
        assert_eq!(template.storage_class_name, "gp2");
    }

    #[test]
    fn test_user_serializes_maria_db_ref() {
        let spec = UserSpec {
            maria_db_ref: DatabaseRef {
                name: "analytics-mariadb".to_string(),
            },
            password_secret_key_ref: SecretKeySelector {
                name: "analytics-secret".to_string(),
                key: "MATOMO_DATABASE_PASSWORD".to_string(),
            },
            max_user_connections: None,
        };
        let value = serde_json::to_value(spec).unwrap();
        assert_eq!(value["mariaDbRef"]["name"], "analytics-mariadb");
        assert_eq!(value["passwordSecretKeyRef"]["key"], "MATOMO_DATABASE_PASSWORD");
    }
}
