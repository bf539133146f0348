//! # Convergence Engine
//!
//! Drives one dependent of one primary toward its desired state:
//!
//! 1. resolve the identity
//! 2. observe the stored object (absent is a valid outcome)
//! 3. evaluate the precondition against primary and observed object
//! 4. collect inputs and compute the desired body
//! 5. fingerprint the desired body and diff it against observed
//! 6. create when absent, update when different, otherwise leave untouched
//!
//! A create that loses a race against a concurrent writer re-observes once
//! and continues down the update path. Every other failure is returned to
//! the caller.
//!
//! The engine holds no per-primary state, so concurrent calls for different
//! primaries are safe. Calls for the same primary must be serialized by the
//! caller.

use super::{matcher, Action, Collaborators, ConvergeError, Dependent, Outcome};
use crate::constants::DESIRED_HASH_ANNOTATION;
use crate::observability::metrics;
use crate::settings::ConfigService;
use crate::store::{kind_of, NamespacedResource, ResourceIdentity, StateStore};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct ConvergenceEngine<S> {
    store: Arc<S>,
    config: Arc<ConfigService<S>>,
}

impl<S> Clone for ConvergenceEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> fmt::Debug for ConvergenceEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvergenceEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: StateStore> ConvergenceEngine<S> {
    pub fn new(store: Arc<S>, config: Arc<ConfigService<S>>) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ConfigService<S> {
        &self.config
    }

    /// Converge `dependent` for `primary` and report what was done
    pub async fn reconcile<P, D>(&self, primary: &P, dependent: &D) -> Result<Outcome, ConvergeError>
    where
        P: NamespacedResource,
        D: Dependent<P>,
    {
        let name = dependent.name();
        let start = Instant::now();
        let result = self.converge(primary, dependent).await;
        match &result {
            Ok(outcome) => {
                metrics::record_dependent_operation(
                    name,
                    outcome.as_str(),
                    start.elapsed().as_secs_f64(),
                );
            }
            Err(e) => {
                metrics::increment_dependent_errors(name);
                warn!(dependent = name, error = %e, "Dependent convergence failed");
            }
        }
        result
    }

    async fn converge<P, D>(&self, primary: &P, dependent: &D) -> Result<Outcome, ConvergeError>
    where
        P: NamespacedResource,
        D: Dependent<P>,
    {
        let name = dependent.name();
        let identity = dependent.identity(primary);
        let kind = kind_of::<D::Resource>();
        let mut observed = self.observe::<D::Resource>(&identity, &kind).await?;
        let mut raced = false;

        loop {
            if !dependent.is_managed(primary, observed.as_ref()) {
                debug!(
                    dependent = name,
                    identity = %identity,
                    "Precondition not met, dependent left unmanaged"
                );
                return Ok(Outcome::Skipped);
            }

            let collaborators = Collaborators {
                store: &*self.store,
                config: &self.config,
            };
            let inputs = dependent
                .collect(primary, observed.as_ref(), &collaborators)
                .await
                .map_err(|source| ConvergeError::Collect {
                    dependent: name,
                    source,
                })?;
            let desired = stamp(dependent.desired(primary, inputs), primary, &identity);
            let desired = fingerprinted(desired).map_err(|source| ConvergeError::Compare {
                kind: kind.clone(),
                identity: identity.clone(),
                source,
            })?;

            let Some(current) = observed.take() else {
                match self.store.create(&identity, &desired).await {
                    Ok(_) => {
                        info!(dependent = name, identity = %identity, "Created dependent");
                        return Ok(Outcome::Created);
                    }
                    Err(e) if e.is_conflict() && !raced => {
                        warn!(
                            dependent = name,
                            identity = %identity,
                            "Dependent was created concurrently, re-observing"
                        );
                        raced = true;
                        observed = self.observe::<D::Resource>(&identity, &kind).await?;
                        if observed.is_none() {
                            return Err(store_error(Action::Create, &kind, &identity, e));
                        }
                        continue;
                    }
                    Err(e) => return Err(store_error(Action::Create, &kind, &identity, e)),
                }
            };

            let unchanged =
                matcher::matches(&desired, &current).map_err(|source| ConvergeError::Compare {
                    kind: kind.clone(),
                    identity: identity.clone(),
                    source,
                })?;
            if unchanged {
                debug!(dependent = name, identity = %identity, "Dependent up to date");
                return Ok(Outcome::Unchanged);
            }

            self.store
                .update(&identity, &desired)
                .await
                .map_err(|e| store_error(Action::Update, &kind, &identity, e))?;
            info!(dependent = name, identity = %identity, "Updated dependent");
            return Ok(Outcome::Updated);
        }
    }

    async fn observe<K: NamespacedResource>(
        &self,
        identity: &ResourceIdentity,
        kind: &str,
    ) -> Result<Option<K>, ConvergeError> {
        self.store
            .get::<K>(identity)
            .await
            .map_err(|e| store_error(Action::Observe, kind, identity, e))
    }
}

/// Pin the resolved identity and the controller owner reference onto `body`
fn stamp<P, K>(mut body: K, primary: &P, identity: &ResourceIdentity) -> K
where
    P: NamespacedResource,
    K: NamespacedResource,
{
    let owner = primary.controller_owner_ref(&());
    let meta = body.meta_mut();
    meta.name = Some(identity.name.clone());
    meta.namespace = Some(identity.namespace.clone());
    if let Some(owner) = owner {
        let refs = meta.owner_references.get_or_insert_with(Vec::new);
        if !refs.iter().any(|r| r.uid == owner.uid) {
            refs.push(owner);
        }
    }
    body
}

/// Record the fingerprint of `body` in its own annotations
///
/// Removals from the desired body change the fingerprint, so they are
/// detected even though the field-wise comparison cannot see them.
fn fingerprinted<K: NamespacedResource>(mut body: K) -> Result<K, serde_json::Error> {
    let hash = matcher::fingerprint(&body)?;
    body.meta_mut()
        .annotations
        .get_or_insert_with(Default::default)
        .insert(DESIRED_HASH_ANNOTATION.to_string(), hash);
    Ok(body)
}

fn store_error(
    action: Action,
    kind: &str,
    identity: &ResourceIdentity,
    source: crate::store::StoreError,
) -> ConvergeError {
    ConvergeError::Store {
        action,
        kind: kind.to_string(),
        identity: identity.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ConfigService;
    use crate::store::InMemoryStore;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    /// ConfigMap mirroring `data` of the primary under `<primary>-mirror`
    struct Mirror;

    impl Dependent<ConfigMap> for Mirror {
        const NAME: &'static str = "mirror";
        type Resource = ConfigMap;
        type Inputs = ();

        fn identity(&self, primary: &ConfigMap) -> ResourceIdentity {
            ResourceIdentity::derive(primary, "mirror")
        }

        fn desired(&self, primary: &ConfigMap, _inputs: ()) -> ConfigMap {
            ConfigMap {
                data: primary.data.clone(),
                ..ConfigMap::default()
            }
        }
    }

    /// Managed only while the primary has no `external` key
    struct Guarded;

    impl Dependent<ConfigMap> for Guarded {
        const NAME: &'static str = "guarded";
        type Resource = ConfigMap;
        type Inputs = ();

        fn identity(&self, primary: &ConfigMap) -> ResourceIdentity {
            ResourceIdentity::derive(primary, "guarded")
        }

        fn is_managed(&self, primary: &ConfigMap, _observed: Option<&ConfigMap>) -> bool {
            primary
                .data
                .as_ref()
                .is_none_or(|data| !data.contains_key("external"))
        }

        fn desired(&self, _primary: &ConfigMap, _inputs: ()) -> ConfigMap {
            ConfigMap::default()
        }
    }

    fn primary(data: &[(&str, &str)]) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("demo".to_string()),
                namespace: Some("ns1".to_string()),
                uid: Some("primary-uid".to_string()),
                ..ObjectMeta::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..ConfigMap::default()
        }
    }

    fn engine() -> (Arc<InMemoryStore>, ConvergenceEngine<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let config = Arc::new(ConfigService::new(Arc::clone(&store), "operator"));
        (Arc::clone(&store), ConvergenceEngine::new(store, config))
    }

    #[tokio::test]
    async fn test_create_then_unchanged() {
        let (store, engine) = engine();
        let primary = primary(&[("replicas", "2")]);

        let first = engine.reconcile(&primary, &Mirror).await.unwrap();
        let second = engine.reconcile(&primary, &Mirror).await.unwrap();

        assert_eq!(first, Outcome::Created);
        assert_eq!(second, Outcome::Unchanged);
        assert_eq!(store.create_count(), 1);
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_changed_primary_updates() {
        let (store, engine) = engine();
        engine
            .reconcile(&primary(&[("replicas", "2")]), &Mirror)
            .await
            .unwrap();

        let outcome = engine
            .reconcile(&primary(&[("replicas", "3")]), &Mirror)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Updated);
        let stored: ConfigMap = store
            .get(&ResourceIdentity::new("demo-mirror", "ns1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.data.unwrap()["replicas"], "3");
    }

    #[tokio::test]
    async fn test_removed_key_is_removed_from_dependent() {
        let (store, engine) = engine();
        engine
            .reconcile(&primary(&[("a", "1"), ("b", "2")]), &Mirror)
            .await
            .unwrap();

        let outcome = engine
            .reconcile(&primary(&[("a", "1")]), &Mirror)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Updated);
        let stored: ConfigMap = store
            .get(&ResourceIdentity::new("demo-mirror", "ns1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.data.unwrap(),
            BTreeMap::from([("a".to_string(), "1".to_string())])
        );

        let again = engine
            .reconcile(&primary(&[("a", "1")]), &Mirror)
            .await
            .unwrap();
        assert_eq!(again, Outcome::Unchanged);
    }

    #[tokio::test]
    async fn test_written_dependent_carries_desired_fingerprint() {
        let (store, engine) = engine();
        engine.reconcile(&primary(&[("a", "1")]), &Mirror).await.unwrap();

        let stored: ConfigMap = store
            .get(&ResourceIdentity::new("demo-mirror", "ns1"))
            .await
            .unwrap()
            .unwrap();
        let annotations = stored.metadata.annotations.unwrap();
        let hash = &annotations[DESIRED_HASH_ANNOTATION];
        assert!(hash.starts_with("sha256:"));
    }

    #[tokio::test]
    async fn test_stamps_identity_and_owner() {
        let (store, engine) = engine();
        engine.reconcile(&primary(&[]), &Mirror).await.unwrap();

        let stored: ConfigMap = store
            .get(&ResourceIdentity::new("demo-mirror", "ns1"))
            .await
            .unwrap()
            .unwrap();
        let owners = stored.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].uid, "primary-uid");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[tokio::test]
    async fn test_unmanaged_dependent_is_never_written() {
        let (store, engine) = engine();
        let primary = primary(&[("external", "user-secret")]);

        for _ in 0..3 {
            let outcome = engine.reconcile(&primary, &Guarded).await.unwrap();
            assert_eq!(outcome, Outcome::Skipped);
        }
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_unmanaged_existing_dependent_is_left_alone() {
        let (store, engine) = engine();
        let mut existing = ConfigMap::default();
        existing.metadata.name = Some("demo-guarded".to_string());
        existing.metadata.namespace = Some("ns1".to_string());
        existing.data = Some(BTreeMap::from([("user".to_string(), "owned".to_string())]));
        store.insert(&existing).unwrap();

        let outcome = engine
            .reconcile(&primary(&[("external", "user-secret")]), &Guarded)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_create_conflict_reobserves_and_updates() {
        let (store, engine) = engine();
        let mut racing = ConfigMap::default();
        racing.metadata.name = Some("demo-mirror".to_string());
        racing.metadata.namespace = Some("ns1".to_string());
        racing.data = Some(BTreeMap::from([("replicas".to_string(), "1".to_string())]));
        store.race_next_create(&racing).unwrap();

        let outcome = engine
            .reconcile(&primary(&[("replicas", "2")]), &Mirror)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Updated);
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_propagates() {
        let (store, engine) = engine();
        store.set_unavailable(true);

        let err = engine
            .reconcile(&primary(&[]), &Mirror)
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert!(matches!(
            err,
            ConvergeError::Store {
                action: Action::Observe,
                ..
            }
        ));
    }
}
