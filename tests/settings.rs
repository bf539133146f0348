//! # Operator Settings Integration Tests
//!
//! Behavior of the operator configuration and cluster inspection against the
//! in-memory store: lazy initialization, explicit overrides, ingress class
//! fallback and cloud provider detection.

mod common;

use app_operator::apps::Application;
use app_operator::dependent::Outcome;
use app_operator::settings::{CloudProvider, ConfigError, ConfigKey};
use app_operator::store::{ResourceIdentity, StateStore};
use common::{gitea, ingress_class, node, operator_config, Harness, OPERATOR_NAMESPACE};
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;

#[tokio::test]
async fn test_configuration_is_created_once_on_first_access() {
    let harness = Harness::new();

    assert_eq!(harness.config.get(ConfigKey::IngressClassName).await.unwrap(), None);
    assert_eq!(harness.config.get(ConfigKey::CloudProvider).await.unwrap(), None);
    harness.config.ensure_initialized().await.unwrap();

    assert_eq!(harness.store.create_count(), 1);
    let config: ConfigMap = harness
        .store
        .get(&ResourceIdentity::new("app-operator-config", OPERATOR_NAMESPACE))
        .await
        .unwrap()
        .expect("configuration should exist");
    assert!(config.labels().contains_key("app-operator.io/config"));
}

#[tokio::test]
async fn test_existing_configuration_is_not_recreated() {
    let harness = Harness::with_settings(&[("ingressClassName", "nginx")]);

    harness.config.ensure_initialized().await.unwrap();

    assert_eq!(harness.store.mutation_count(), 0);
    assert_eq!(
        harness.config.ingress_class_name().await.unwrap().as_deref(),
        Some("nginx")
    );
}

#[tokio::test]
async fn test_configuration_created_concurrently_counts_as_initialized() {
    let harness = Harness::new();
    harness
        .store
        .race_next_create(&operator_config(&[("ingressClassName", "nginx")]))
        .unwrap();

    harness.config.ensure_initialized().await.unwrap();

    assert_eq!(harness.store.create_count(), 1);
    assert_eq!(
        harness.config.ingress_class_name().await.unwrap().as_deref(),
        Some("nginx")
    );
}

#[tokio::test]
async fn test_failed_initialization_is_retried() {
    let harness = Harness::new();
    harness.store.set_unavailable(true);

    let err = harness.config.ensure_initialized().await.unwrap_err();
    assert!(matches!(err, ConfigError::Store(_)));

    harness.store.set_unavailable(false);
    harness.config.ensure_initialized().await.unwrap();

    assert_eq!(harness.store.create_count(), 1);
    let config: Option<ConfigMap> = harness
        .store
        .get(&ResourceIdentity::new("app-operator-config", OPERATOR_NAMESPACE))
        .await
        .unwrap();
    assert!(config.is_some());
}

#[tokio::test]
async fn test_removed_ingress_class_override_is_cleared_from_ingress() {
    let harness = Harness::with_settings(&[("ingressClassName", "nginx")]);
    harness.store.insert(&ingress_class("nginx", false)).unwrap();
    harness.store.insert(&ingress_class("traefik", false)).unwrap();
    let primary = gitea("demo", "ns1");
    primary.converge(&harness.engine).await.unwrap();

    harness.store.insert(&operator_config(&[])).unwrap();
    let report = primary.converge(&harness.engine).await.unwrap();

    assert_eq!(report.outcome_of("gitea-ingress"), Some(Outcome::Updated));
    let ingress: Ingress = harness
        .store
        .get(&ResourceIdentity::new("demo-gitea", "ns1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ingress.spec.unwrap().ingress_class_name, None);
}

#[tokio::test]
async fn test_configured_ingress_class_wins_over_cluster_default() {
    let harness = Harness::with_settings(&[("ingressClassName", "internal")]);
    harness.store.insert(&ingress_class("nginx", true)).unwrap();

    assert_eq!(
        harness.config.ingress_class_name().await.unwrap().as_deref(),
        Some("internal")
    );
}

#[tokio::test]
async fn test_ingress_class_fallback_chain() {
    let harness = Harness::new();
    assert_eq!(harness.config.ingress_class_name().await.unwrap(), None);

    harness.store.insert(&ingress_class("traefik", false)).unwrap();
    assert_eq!(
        harness.config.ingress_class_name().await.unwrap().as_deref(),
        Some("traefik")
    );

    harness.store.insert(&ingress_class("nginx", false)).unwrap();
    assert_eq!(harness.config.ingress_class_name().await.unwrap(), None);

    harness.store.insert(&ingress_class("haproxy", true)).unwrap();
    assert_eq!(
        harness.config.ingress_class_name().await.unwrap().as_deref(),
        Some("haproxy")
    );
}

#[tokio::test]
async fn test_blank_setting_counts_as_unset() {
    let harness = Harness::with_settings(&[("ingressClassName", "  "), ("cloudProvider", "")]);
    harness.store.insert(&ingress_class("nginx", false)).unwrap();

    assert_eq!(
        harness.config.ingress_class_name().await.unwrap().as_deref(),
        Some("nginx")
    );
    assert_eq!(
        harness.config.cloud_provider().await.unwrap(),
        CloudProvider::Generic
    );
}

#[tokio::test]
async fn test_cloud_provider_detection_priority() {
    let harness = Harness::new();
    harness
        .store
        .insert(&node("hetzner-1", &[("csi.hetzner.cloud/location", "fsn1")]))
        .unwrap();
    assert_eq!(harness.config.cloud_provider().await.unwrap(), CloudProvider::Hcloud);

    harness
        .store
        .insert(&node("eks-1", &[("eks.amazonaws.com/nodegroup", "workers")]))
        .unwrap();
    assert_eq!(harness.config.cloud_provider().await.unwrap(), CloudProvider::Aws);
}

#[tokio::test]
async fn test_explicit_cloud_provider_overrides_detection() {
    let harness = Harness::with_settings(&[("cloudProvider", "Generic")]);
    harness
        .store
        .insert(&node("eks-1", &[("eks.amazonaws.com/nodegroup", "workers")]))
        .unwrap();

    assert_eq!(
        harness.config.cloud_provider().await.unwrap(),
        CloudProvider::Generic
    );
}

#[tokio::test]
async fn test_unknown_cloud_provider_is_rejected() {
    let harness = Harness::with_settings(&[("cloudProvider", "openstack")]);

    let err = harness.config.cloud_provider().await.unwrap_err();

    match err {
        ConfigError::InvalidValue { key, value } => {
            assert_eq!(key, ConfigKey::CloudProvider);
            assert_eq!(value, "openstack");
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[tokio::test]
async fn test_detected_provider_selects_volume_storage_class() {
    let harness = Harness::new();
    harness
        .store
        .insert(&node("hetzner-1", &[("csi.hetzner.cloud/location", "nbg1")]))
        .unwrap();
    harness.store.insert(&ingress_class("nginx", true)).unwrap();

    gitea("demo", "ns1").converge(&harness.engine).await.unwrap();

    let volume: PersistentVolumeClaim = harness
        .store
        .get(&ResourceIdentity::new("demo-gitea-data", "ns1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        volume.spec.unwrap().storage_class_name.as_deref(),
        Some("hcloud-volumes")
    );

    let ingress: Ingress = harness
        .store
        .get(&ResourceIdentity::new("demo-gitea", "ns1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        ingress.spec.unwrap().ingress_class_name.as_deref(),
        Some("nginx")
    );
}

#[tokio::test]
async fn test_generic_cluster_leaves_storage_class_unset() {
    let harness = Harness::new();

    gitea("demo", "ns1").converge(&harness.engine).await.unwrap();

    let volume: PersistentVolumeClaim = harness
        .store
        .get(&ResourceIdentity::new("demo-gitea-data", "ns1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(volume.spec.unwrap().storage_class_name, None);
}
