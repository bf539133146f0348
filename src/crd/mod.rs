//! # Custom Resource Definitions
//!
//! Primary resources served by this operator, plus the foreign custom
//! resources it writes as dependents.
//!
//! ## Module Structure
//!
//! - `gitea.rs` - Gitea source hosting instances
//! - `matomo.rs` - Matomo web analytics instances
//! - `minio.rs` - MinIO buckets and their credentials
//! - `status.rs` - Status shared by every primary
//! - `mariadb.rs` - MariaDB operator resources (foreign)
//! - `postgres.rs` - CloudNativePG resources (foreign)

mod gitea;
mod mariadb;
mod matomo;
mod minio;
mod postgres;
mod status;

pub use gitea::{Gitea, GiteaResources, GiteaSpec};
pub use mariadb::{
    DatabaseRef, MariaDB, MariaDBExporter, MariaDBImage, MariaDBMetrics, MariaDBResources,
    MariaDBResourcesRequest, MariaDBServiceMonitor, MariaDBSpec, MariaDBUser,
    MariaDBVolumeClaimTemplate, UserSpec,
};
pub use matomo::{Matomo, MatomoSpec};
pub use minio::{MinioBucket, MinioBucketSpec};
pub use postgres::{
    BootstrapConfiguration, BootstrapInitDB, ClusterSpec, PostgresCluster,
    StorageConfiguration,
};
pub use status::AppStatus;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to a Secret in the same namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct LocalObjectReference {
    pub name: String,
}

/// Selects one key of a Secret in the same namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
}

/// Persistent storage overrides shared by primaries
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpec {
    /// Requested volume size as a Kubernetes quantity (e.g. "20Gi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Storage class for the volume
    /// Defaults to the class matching the detected cloud provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
}
