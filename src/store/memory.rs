//! # In-Memory State Store
//!
//! JSON-backed [`StateStore`] used by tests and dry runs. Objects are kept
//! in their serialized form, exactly as a real API server would return them:
//! every write assigns a fresh `resourceVersion`, creations get a `uid`, and
//! mutating calls are counted so callers can assert on them.

use super::{
    kind_of, LabelSelector, ManagedResource, NamespacedResource, ResourceIdentity, StateStore,
    StoreError,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// (kind, namespace, name)
type ObjectKey = (String, Option<String>, String);

#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: Mutex<BTreeMap<ObjectKey, Value>>,
    // Object "created by someone else" right before the next matching create
    racing_create: Mutex<Option<(ObjectKey, Value)>>,
    resource_version: AtomicU64,
    creates: AtomicUsize,
    updates: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a mutation
    pub fn insert<K: ManagedResource>(&self, object: &K) -> Result<(), StoreError> {
        let (key, value) = self.prepare(object, None)?;
        self.objects()?.insert(key, value);
        Ok(())
    }

    /// Number of `create` calls that reached the store
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of `update` calls that reached the store
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn mutation_count(&self) -> usize {
        self.create_count() + self.update_count()
    }

    /// Simulate a concurrent writer: `object` appears right before the next
    /// `create` of the same identity, which then fails with a conflict
    pub fn race_next_create<K: ManagedResource>(&self, object: &K) -> Result<(), StoreError> {
        let prepared = self.prepare(object, None)?;
        *self
            .racing_create
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))? = Some(prepared);
        Ok(())
    }

    /// Make every subsequent call fail as if the API server were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    fn objects(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<ObjectKey, Value>>, StoreError> {
        self.objects
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn next_version(&self) -> u64 {
        self.resource_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Serialize `object`, stamp store-owned metadata and compute its key
    fn prepare<K: ManagedResource>(
        &self,
        object: &K,
        id: Option<&ResourceIdentity>,
    ) -> Result<(ObjectKey, Value), StoreError> {
        let kind = kind_of::<K>();
        let mut value = serde_json::to_value(object).map_err(|source| StoreError::Serialization {
            kind: kind.clone(),
            source,
        })?;
        let version = self.next_version();
        let Some(metadata) = metadata_mut(&mut value) else {
            return Err(StoreError::Serialization {
                kind,
                source: <serde_json::Error as serde::de::Error>::custom(
                    "object did not serialize to a map with metadata",
                ),
            });
        };
        if let Some(id) = id {
            metadata.insert("name".to_string(), Value::String(id.name.clone()));
            metadata.insert("namespace".to_string(), Value::String(id.namespace.clone()));
        }
        metadata
            .entry("uid".to_string())
            .or_insert_with(|| Value::String(format!("uid-{version}")));
        metadata.insert(
            "resourceVersion".to_string(),
            Value::String(version.to_string()),
        );
        let name = metadata
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let namespace = metadata
            .get("namespace")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(((kind, namespace, name), value))
    }
}

fn metadata_mut(value: &mut Value) -> Option<&mut serde_json::Map<String, Value>> {
    value
        .as_object_mut()?
        .entry("metadata".to_string())
        .or_insert_with(|| Value::Object(serde_json::Map::new()))
        .as_object_mut()
}

fn decode<K: ManagedResource>(value: &Value) -> Result<K, StoreError> {
    serde_json::from_value(value.clone()).map_err(|source| StoreError::Serialization {
        kind: kind_of::<K>(),
        source,
    })
}

fn key_of<K: ManagedResource>(id: &ResourceIdentity) -> ObjectKey {
    (kind_of::<K>(), Some(id.namespace.clone()), id.name.clone())
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn get<K>(&self, id: &ResourceIdentity) -> Result<Option<K>, StoreError>
    where
        K: NamespacedResource,
    {
        self.check_available()?;
        let objects = self.objects()?;
        objects.get(&key_of::<K>(id)).map(decode::<K>).transpose()
    }

    async fn create<K>(&self, id: &ResourceIdentity, body: &K) -> Result<K, StoreError>
    where
        K: NamespacedResource,
    {
        self.check_available()?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        let key = key_of::<K>(id);

        let raced = {
            let mut racing = self
                .racing_create
                .lock()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            match racing.take() {
                Some((race_key, value)) if race_key == key => Some(value),
                other => {
                    *racing = other;
                    None
                }
            }
        };

        let mut objects = self.objects()?;
        if let Some(value) = raced {
            objects.insert(key.clone(), value);
        }
        if objects.contains_key(&key) {
            return Err(StoreError::Conflict {
                kind: kind_of::<K>(),
                identity: id.to_string(),
            });
        }
        let (_, value) = self.prepare(body, Some(id))?;
        let stored = decode::<K>(&value)?;
        objects.insert(key, value);
        Ok(stored)
    }

    async fn update<K>(&self, id: &ResourceIdentity, body: &K) -> Result<K, StoreError>
    where
        K: NamespacedResource,
    {
        self.check_available()?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        let key = key_of::<K>(id);
        let mut objects = self.objects()?;
        let Some(existing) = objects.get(&key) else {
            return Err(StoreError::NotFound {
                kind: kind_of::<K>(),
                identity: id.to_string(),
            });
        };
        let uid = existing
            .pointer("/metadata/uid")
            .cloned()
            .unwrap_or(Value::Null);
        let (_, mut value) = self.prepare(body, Some(id))?;
        if let (false, Some(metadata)) = (uid.is_null(), metadata_mut(&mut value)) {
            metadata.insert("uid".to_string(), uid);
        }
        let stored = decode::<K>(&value)?;
        objects.insert(key, value);
        Ok(stored)
    }

    async fn list<K>(&self, selector: &LabelSelector) -> Result<Vec<K>, StoreError>
    where
        K: ManagedResource,
    {
        self.check_available()?;
        let kind = kind_of::<K>();
        let objects = self.objects()?;
        objects
            .iter()
            .filter(|((object_kind, _, _), _)| *object_kind == kind)
            .filter(|(_, value)| {
                let labels = value
                    .pointer("/metadata/labels")
                    .and_then(|l| serde_json::from_value::<BTreeMap<String, String>>(l.clone()).ok());
                selector.matches(labels.as_ref())
            })
            .map(|(_, value)| decode::<K>(value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ConfigMap, Node};
    use kube::api::ObjectMeta;
    use kube::ResourceExt;

    fn config_map(name: &str, namespace: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..ObjectMeta::default()
            },
            data: Some(BTreeMap::from([("k".to_string(), "v".to_string())])),
            ..ConfigMap::default()
        }
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = InMemoryStore::new();
        let found: Option<ConfigMap> = store
            .get(&ResourceIdentity::new("missing", "ns1"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_create_stamps_metadata_and_counts() {
        let store = InMemoryStore::new();
        let id = ResourceIdentity::new("cm", "ns1");
        let created = store.create(&id, &config_map("cm", "ns1")).await.unwrap();
        assert!(created.metadata.uid.is_some());
        assert!(created.metadata.resource_version.is_some());
        assert_eq!(store.create_count(), 1);

        let again = store.create(&id, &config_map("cm", "ns1")).await;
        assert!(matches!(again, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_keeps_uid_and_bumps_version() {
        let store = InMemoryStore::new();
        let id = ResourceIdentity::new("cm", "ns1");
        let created = store.create(&id, &config_map("cm", "ns1")).await.unwrap();
        let updated = store.update(&id, &config_map("cm", "ns1")).await.unwrap();
        assert_eq!(created.metadata.uid, updated.metadata.uid);
        assert_ne!(
            created.metadata.resource_version,
            updated.metadata.resource_version
        );
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = InMemoryStore::new();
        let id = ResourceIdentity::new("cm", "ns1");
        let result = store.update(&id, &config_map("cm", "ns1")).await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_by_kind_and_selector() {
        let store = InMemoryStore::new();
        let mut node = Node::default();
        node.metadata.name = Some("worker-1".to_string());
        node.labels_mut()
            .insert("csi.hetzner.cloud/location".to_string(), "fsn1".to_string());
        store.insert(&node).unwrap();
        store.insert(&config_map("cm", "ns1")).unwrap();

        let all: Vec<Node> = store.list(&LabelSelector::everything()).await.unwrap();
        assert_eq!(all.len(), 1);
        let hcloud: Vec<Node> = store
            .list(&LabelSelector::everything().exists("csi.hetzner.cloud/location"))
            .await
            .unwrap();
        assert_eq!(hcloud.len(), 1);
        let aws: Vec<Node> = store
            .list(&LabelSelector::everything().exists("eks.amazonaws.com/nodegroup"))
            .await
            .unwrap();
        assert!(aws.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        let result: Result<Option<ConfigMap>, _> =
            store.get(&ResourceIdentity::new("cm", "ns1")).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
