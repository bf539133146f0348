//! # Kubernetes-backed State Store
//!
//! [`StateStore`] over a live `kube::Client`. Creates and updates both use
//! server-side apply with one fixed field manager, so fields owned by other
//! managers survive and fields dropped from a desired body are removed.

use super::{
    kind_of, LabelSelector, ManagedResource, NamespacedResource, ResourceIdentity, StateStore,
    StoreError,
};
use async_trait::async_trait;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use tracing::debug;

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn namespaced<K: NamespacedResource>(&self, id: &ResourceIdentity) -> Api<K> {
        Api::namespaced(self.client.clone(), &id.namespace)
    }
}

/// Map API status codes onto the store's error taxonomy
fn classify<K: ManagedResource>(id: &ResourceIdentity, error: kube::Error) -> StoreError {
    match error {
        kube::Error::Api(ref api_err) if api_err.code == 404 => StoreError::NotFound {
            kind: kind_of::<K>(),
            identity: id.to_string(),
        },
        kube::Error::Api(ref api_err) if api_err.code == 409 => StoreError::Conflict {
            kind: kind_of::<K>(),
            identity: id.to_string(),
        },
        other => StoreError::Kube(other),
    }
}

#[async_trait]
impl StateStore for KubeStore {
    async fn get<K>(&self, id: &ResourceIdentity) -> Result<Option<K>, StoreError>
    where
        K: NamespacedResource,
    {
        self.namespaced::<K>(id)
            .get_opt(&id.name)
            .await
            .map_err(|e| classify::<K>(id, e))
    }

    async fn create<K>(&self, id: &ResourceIdentity, body: &K) -> Result<K, StoreError>
    where
        K: NamespacedResource,
    {
        debug!(kind = %kind_of::<K>(), identity = %id, "store.create");
        // Unforced apply: the same field manager owns every field from the
        // first write on, and an object another manager created concurrently
        // with different values surfaces as a 409 conflict
        let params = PatchParams::apply(&self.field_manager);
        self.namespaced::<K>(id)
            .patch(&id.name, &params, &Patch::Apply(body))
            .await
            .map_err(|e| classify::<K>(id, e))
    }

    async fn update<K>(&self, id: &ResourceIdentity, body: &K) -> Result<K, StoreError>
    where
        K: NamespacedResource,
    {
        debug!(kind = %kind_of::<K>(), identity = %id, "store.update");
        let params = PatchParams::apply(&self.field_manager).force();
        self.namespaced::<K>(id)
            .patch(&id.name, &params, &Patch::Apply(body))
            .await
            .map_err(|e| classify::<K>(id, e))
    }

    async fn list<K>(&self, selector: &LabelSelector) -> Result<Vec<K>, StoreError>
    where
        K: ManagedResource,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let mut params = ListParams::default();
        if !selector.is_empty() {
            params = params.labels(&selector.to_string());
        }
        let list = api.list(&params).await.map_err(StoreError::Kube)?;
        Ok(list.items)
    }
}
