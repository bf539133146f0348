//! # CloudNativePG Resources
//!
//! Subset of the `postgresql.cnpg.io/v1` `Cluster` API used to provision
//! application databases.

use super::LocalObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Cluster",
    root = "PostgresCluster",
    group = "postgresql.cnpg.io",
    version = "v1",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub instances: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<BootstrapConfiguration>,
    pub storage: StorageConfiguration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct BootstrapConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initdb: Option<BootstrapInitDB>,
}

/// `initdb` bootstrap of a new cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapInitDB {
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<LocalObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_checksums: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale_collate: Option<String>,
    #[serde(default, rename = "localeCType", skip_serializing_if = "Option::is_none")]
    pub locale_c_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wal_segment_size: Option<i32>,
    #[serde(default, rename = "postInitSQL", skip_serializing_if = "Option::is_none")]
    pub post_init_sql: Option<Vec<String>>,
    #[serde(
        default,
        rename = "postInitApplicationSQL",
        skip_serializing_if = "Option::is_none"
    )]
    pub post_init_application_sql: Option<Vec<String>>,
    #[serde(
        default,
        rename = "postInitTemplateSQL",
        skip_serializing_if = "Option::is_none"
    )]
    pub post_init_template_sql: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfiguration {
    /// Volume size as a Kubernetes quantity
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initdb_uses_cnpg_field_names() {
        let initdb = BootstrapInitDB {
            database: "gitea".to_string(),
            owner: Some("gitea".to_string()),
            locale_c_type: Some("C".to_string()),
            post_init_sql: Some(vec!["CREATE EXTENSION pg_trgm".to_string()]),
            ..BootstrapInitDB::default()
        };
        let value = serde_json::to_value(initdb).unwrap();
        assert_eq!(value["localeCType"], "C");
        assert_eq!(value["postInitSQL"][0], "CREATE EXTENSION pg_trgm");
        assert!(value.get("encoding").is_none());
    }
}
