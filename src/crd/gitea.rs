//! # Gitea
//!
//! A self-hosted Gitea instance backed by a CloudNativePG database.

use super::{LocalObjectReference, StorageSpec};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Gitea instance
///
/// # Example
///
/// ```yaml
/// apiVersion: app-operator.io/v1alpha1
/// kind: Gitea
/// metadata:
///   name: git
///   namespace: tools
/// spec:
///   host: git.example.com
///   replicas: 1
///   adminSecret:
///     name: gitea-admin
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Gitea",
    group = "app-operator.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::AppStatus",
    shortname = "gt",
    printcolumn = r#"{"name":"Host", "type":"string", "jsonPath":".spec.host"}, {"name":"Replicas", "type":"integer", "jsonPath":".spec.replicas"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GiteaSpec {
    /// Public host name the ingress serves Gitea on
    pub host: String,
    /// Number of Gitea pods
    #[serde(default = "default_replicas")]
    pub replicas: i32,
    /// Secret holding GITEA_ADMIN_USER, GITEA_ADMIN_PASSWORD and GITEA_ADMIN_EMAIL
    /// When set, an init container creates or resets the admin user on every rollout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_secret: Option<LocalObjectReference>,
    /// Repository volume overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageSpec>,
    /// Memory overrides for the Gitea container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<GiteaResources>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GiteaResources {
    /// Memory request, as a Kubernetes quantity (default "200Mi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<String>,
    /// Memory limit, as a Kubernetes quantity (default "300Mi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
}

fn default_replicas() -> i32 {
    1
}

impl GiteaSpec {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            replicas: default_replicas(),
            admin_secret: None,
            storage: None,
            resources: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replicas_default_to_one() {
        let spec: GiteaSpec = serde_json::from_value(serde_json::json!({
            "host": "git.example.com"
        }))
        .unwrap();
        assert_eq!(spec.replicas, 1);
        assert!(spec.admin_secret.is_none());
    }

    #[test]
    fn test_admin_secret_is_camel_case() {
        let spec: GiteaSpec = serde_json::from_value(serde_json::json!({
            "host": "git.example.com",
            "adminSecret": { "name": "gitea-admin" }
        }))
        .unwrap();
        assert_eq!(spec.admin_secret.unwrap().name, "gitea-admin");
    }
}
