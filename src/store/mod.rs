//! # State Store
//!
//! The narrow slice of the cluster API the reconciliation core needs:
//! typed `get`, `create`, `update` and label-selected `list`.
//!
//! - `cluster` - [`KubeStore`], backed by a live `kube::Client`
//! - `memory` - [`InMemoryStore`], JSON-backed store for tests and dry runs
//! - `selector` - [`LabelSelector`] requirements shared by both

mod cluster;
mod memory;
mod selector;

pub use cluster::KubeStore;
pub use memory::InMemoryStore;
pub use selector::{LabelSelector, Requirement};

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use thiserror::Error;

/// Any typed object the store can read and write
pub trait ManagedResource:
    ::kube::Resource<DynamicType = ()>
    + Clone
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> ManagedResource for K where
    K: ::kube::Resource<DynamicType = ()>
        + Clone
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// A [`ManagedResource`] that lives inside a namespace
pub trait NamespacedResource: ManagedResource + ::kube::Resource<Scope = NamespaceResourceScope> {}

impl<K> NamespacedResource for K where K: ManagedResource + ::kube::Resource<Scope = NamespaceResourceScope> {}

/// Stable identity of a namespaced object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceIdentity {
    pub name: String,
    pub namespace: String,
}

impl ResourceIdentity {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Kind label used in logs and errors, e.g. `apps/v1/Deployment`
pub fn kind_of<K: ManagedResource>() -> String {
    format!("{}/{}", K::api_version(&()), K::kind(&()))
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {identity} not found")]
    NotFound { kind: String, identity: String },

    #[error("{kind} {identity} already exists or was modified concurrently")]
    Conflict { kind: String, identity: String },

    #[error("Kubernetes API request failed: {0}")]
    Kube(#[source] ::kube::Error),

    #[error("Failed to (de)serialize {kind}: {source}")]
    Serialization {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("State store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Typed access to the cluster state store
///
/// `get` maps "not found" to `Ok(None)`; every other failure is an error.
/// `create` reports an existing object it cannot take over as
/// [`StoreError::Conflict`].
/// `update` replaces the fields this operator manages and leaves fields owned
/// by other managers alone where the backend supports field ownership.
/// `list` is cluster-wide; an empty result is not an error.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get<K>(&self, id: &ResourceIdentity) -> Result<Option<K>, StoreError>
    where
        K: NamespacedResource;

    async fn create<K>(&self, id: &ResourceIdentity, body: &K) -> Result<K, StoreError>
    where
        K: NamespacedResource;

    async fn update<K>(&self, id: &ResourceIdentity, body: &K) -> Result<K, StoreError>
    where
        K: NamespacedResource;

    async fn list<K>(&self, selector: &LabelSelector) -> Result<Vec<K>, StoreError>
    where
        K: ManagedResource;
}
