//! # Operator Settings
//!
//! Operator-wide settings resolved from a ConfigMap in the operator namespace
//! and, where no explicit value is configured, from live cluster inspection.
//!
//! The ConfigMap is created empty on first use. Resolved values are computed
//! on every read because the cluster state they are derived from can change
//! between reads.

mod provider;

pub use provider::{CloudProvider, ParseCloudProviderError};

use crate::constants::{
    CONFIG_MAP_LABEL, CONFIG_MAP_NAME, DEFAULT_INGRESS_CLASS_ANNOTATION, NODE_LABEL_AWS,
    NODE_LABEL_HCLOUD,
};
use crate::store::{LabelSelector, ResourceIdentity, StateStore, StoreError};
use k8s_openapi::api::core::v1::{ConfigMap, Node};
use k8s_openapi::api::networking::v1::IngressClass;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Node markers checked in order; the first marker present on any node wins
const PROVIDER_MARKERS: &[(&str, CloudProvider)] = &[
    (NODE_LABEL_AWS, CloudProvider::Aws),
    (NODE_LABEL_HCLOUD, CloudProvider::Hcloud),
];

/// Well-known keys of the operator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    IngressClassName,
    CloudProvider,
}

impl ConfigKey {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::IngressClassName => "ingressClassName",
            ConfigKey::CloudProvider => "cloudProvider",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access operator configuration: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid value '{value}' for operator configuration key {key}")]
    InvalidValue { key: ConfigKey, value: String },
}

/// Resolves operator-wide settings through ordered fallback chains
pub struct ConfigService<S> {
    store: Arc<S>,
    identity: ResourceIdentity,
    initialized: OnceCell<()>,
}

impl<S> fmt::Debug for ConfigService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigService")
            .field("identity", &self.identity)
            .field("initialized", &self.initialized.initialized())
            .finish_non_exhaustive()
    }
}

impl<S: StateStore> ConfigService<S> {
    pub fn new(store: Arc<S>, operator_namespace: impl Into<String>) -> Self {
        Self {
            store,
            identity: ResourceIdentity::new(CONFIG_MAP_NAME, operator_namespace),
            initialized: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Identity of the backing ConfigMap
    pub fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    /// Create the backing ConfigMap if it does not exist yet
    ///
    /// Runs the check-then-create at most once per process. A concurrent
    /// creation by another replica counts as success. A failed attempt leaves
    /// the guard unset so the next caller retries.
    pub async fn ensure_initialized(&self) -> Result<(), ConfigError> {
        self.initialized
            .get_or_try_init(|| async {
                let existing: Option<ConfigMap> = self.store.get(&self.identity).await?;
                if existing.is_some() {
                    debug!(config = %self.identity, "Operator configuration present");
                    return Ok(());
                }
                info!(config = %self.identity, "Creating empty operator configuration");
                match self.store.create(&self.identity, &self.empty_config()).await {
                    Ok(_) => Ok(()),
                    Err(e) if e.is_conflict() => {
                        debug!(config = %self.identity, "Operator configuration created concurrently");
                        Ok(())
                    }
                    Err(e) => Err(ConfigError::Store(e)),
                }
            })
            .await
            .map(|_| ())
    }

    fn empty_config(&self) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(self.identity.name.clone()),
                namespace: Some(self.identity.namespace.clone()),
                labels: Some(BTreeMap::from([(
                    CONFIG_MAP_LABEL.to_string(),
                    String::new(),
                )])),
                ..ObjectMeta::default()
            },
            ..ConfigMap::default()
        }
    }

    /// Explicitly configured value for `key`, without any fallback
    ///
    /// Blank values count as unset.
    pub async fn get(&self, key: ConfigKey) -> Result<Option<String>, ConfigError> {
        self.ensure_initialized().await?;
        let config: Option<ConfigMap> = self.store.get(&self.identity).await?;
        if config.is_none() {
            warn!(config = %self.identity, "Operator configuration disappeared, treating all keys as unset");
        }
        Ok(config
            .and_then(|c| c.data)
            .and_then(|mut data| data.remove(key.as_str()))
            .filter(|value| !value.trim().is_empty()))
    }

    /// Ingress class for generated ingresses
    ///
    /// 1. the configured `ingressClassName`
    /// 2. the only IngressClass marked as cluster default
    /// 3. the only IngressClass in the cluster
    /// 4. none; ingresses are then created without a class
    pub async fn ingress_class_name(&self) -> Result<Option<String>, ConfigError> {
        if let Some(configured) = self.get(ConfigKey::IngressClassName).await? {
            return Ok(Some(configured));
        }
        let classes: Vec<IngressClass> = self.store.list(&LabelSelector::everything()).await?;
        let resolved = select_ingress_class(&classes);
        match &resolved {
            Some(name) => debug!(ingress_class = %name, "Resolved ingress class from cluster"),
            None => warn!(
                classes = classes.len(),
                "No unambiguous ingress class; set '{}' in the operator configuration",
                ConfigKey::IngressClassName
            ),
        }
        Ok(resolved)
    }

    /// Cloud provider the cluster runs on
    ///
    /// 1. the configured `cloudProvider`
    /// 2. the first node marker found, checked in fixed priority order
    /// 3. [`CloudProvider::Generic`]
    pub async fn cloud_provider(&self) -> Result<CloudProvider, ConfigError> {
        if let Some(configured) = self.get(ConfigKey::CloudProvider).await? {
            return match configured.parse::<CloudProvider>() {
                Ok(provider) => Ok(provider),
                Err(ParseCloudProviderError(value)) => Err(ConfigError::InvalidValue {
                    key: ConfigKey::CloudProvider,
                    value,
                }),
            };
        }
        for (marker, provider) in PROVIDER_MARKERS {
            let nodes: Vec<Node> = self
                .store
                .list(&LabelSelector::everything().exists(*marker))
                .await?;
            if !nodes.is_empty() {
                debug!(marker = *marker, provider = %provider, "Detected cloud provider from node labels");
                return Ok(*provider);
            }
        }
        Ok(CloudProvider::Generic)
    }
}

/// Unique default-marked class, else the unique class, else none
pub fn select_ingress_class(classes: &[IngressClass]) -> Option<String> {
    let defaults: Vec<&IngressClass> = classes
        .iter()
        .filter(|class| {
            class
                .annotations()
                .get(DEFAULT_INGRESS_CLASS_ANNOTATION)
                .is_some_and(|v| v == "true")
        })
        .collect();
    match (defaults.as_slice(), classes) {
        ([only_default], _) => Some(only_default.name_any()),
        (_, [only]) => Some(only.name_any()),
        _ => None,
    }
}
