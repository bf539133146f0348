//! Shared fixtures for integration tests

#![allow(dead_code)]

use app_operator::crd::{Gitea, GiteaSpec, Matomo, MatomoSpec, MinioBucket, MinioBucketSpec};
use app_operator::dependent::ConvergenceEngine;
use app_operator::settings::ConfigService;
use app_operator::store::InMemoryStore;
use k8s_openapi::api::core::v1::{ConfigMap, Node};
use k8s_openapi::api::networking::v1::IngressClass;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const OPERATOR_NAMESPACE: &str = "app-operator-system";

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub config: Arc<ConfigService<InMemoryStore>>,
    pub engine: ConvergenceEngine<InMemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let config = Arc::new(ConfigService::new(Arc::clone(&store), OPERATOR_NAMESPACE));
        let engine = ConvergenceEngine::new(Arc::clone(&store), Arc::clone(&config));
        Self {
            store,
            config,
            engine,
        }
    }

    /// Harness whose operator configuration already holds `data`
    pub fn with_settings(data: &[(&str, &str)]) -> Self {
        let harness = Self::new();
        harness.store.insert(&operator_config(data)).unwrap();
        harness
    }
}

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

pub fn meta(name: &str, namespace: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        uid: Some(format!("{}-uid", name)),
        generation: Some(1),
        ..ObjectMeta::default()
    }
}

pub fn operator_config(data: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: meta("app-operator-config", Some(OPERATOR_NAMESPACE)),
        data: Some(string_map(data)),
        ..ConfigMap::default()
    }
}

pub fn gitea(name: &str, namespace: &str) -> Gitea {
    let mut gitea = Gitea::new(name, GiteaSpec::new(format!("{}.example.com", name)));
    gitea.metadata = meta(name, Some(namespace));
    gitea
}

pub fn matomo(name: &str, namespace: &str) -> Matomo {
    let mut matomo = Matomo::new(
        name,
        MatomoSpec {
            host: format!("{}.example.com", name),
            storage: None,
        },
    );
    matomo.metadata = meta(name, Some(namespace));
    matomo
}

pub fn bucket(name: &str, namespace: &str, spec: MinioBucketSpec) -> MinioBucket {
    let mut bucket = MinioBucket::new(name, spec);
    bucket.metadata = meta(name, Some(namespace));
    bucket
}

pub fn node(name: &str, labels: &[(&str, &str)]) -> Node {
    let mut metadata = meta(name, None);
    metadata.labels = Some(string_map(labels));
    Node {
        metadata,
        ..Node::default()
    }
}

pub fn ingress_class(name: &str, default: bool) -> IngressClass {
    let mut metadata = meta(name, None);
    if default {
        metadata.annotations = Some(string_map(&[(
            "ingressclass.kubernetes.io/is-default-class",
            "true",
        )]));
    }
    IngressClass {
        metadata,
        ..IngressClass::default()
    }
}
