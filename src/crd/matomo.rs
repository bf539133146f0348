//! # Matomo
//!
//! A Matomo analytics instance backed by a MariaDB database.

use super::StorageSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Matomo",
    group = "app-operator.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::AppStatus",
    shortname = "mt",
    printcolumn = r#"{"name":"Host", "type":"string", "jsonPath":".spec.host"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MatomoSpec {
    /// Public host name the ingress serves Matomo on
    pub host: String,
    /// Database volume overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageSpec>,
}
