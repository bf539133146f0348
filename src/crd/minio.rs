//! # MinIO Bucket
//!
//! A bucket on the shared MinIO tenant, with credentials for a bucket user.

use super::LocalObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "MinioBucket",
    group = "app-operator.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::AppStatus",
    shortname = "mb"
)]
#[serde(rename_all = "camelCase")]
pub struct MinioBucketSpec {
    /// Existing basic-auth Secret with the bucket user's credentials
    /// When unset, the operator generates one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_secret: Option<LocalObjectReference>,
}
