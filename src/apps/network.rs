//! # Network
//!
//! Services and ingresses exposing an application.

use crate::dependent::Collaborators;
use crate::settings::ConfigError;
use crate::store::StateStore;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// Inputs of an ingress dependent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngressInputs {
    /// `None` when the cluster has no unambiguous ingress class
    pub class_name: Option<String>,
}

pub async fn resolve_ingress_class<S: StateStore>(
    collaborators: &Collaborators<'_, S>,
) -> Result<IngressInputs, ConfigError> {
    Ok(IngressInputs {
        class_name: collaborators.config.ingress_class_name().await?,
    })
}

/// Service of `type_` forwarding each `(name, port)` to the same container port
pub fn service(
    labels: BTreeMap<String, String>,
    selector: BTreeMap<String, String>,
    type_: &str,
    ports: &[(&str, i32)],
) -> Service {
    Service {
        metadata: ObjectMeta {
            labels: Some(labels),
            ..ObjectMeta::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(type_.to_string()),
            selector: Some(selector),
            ports: Some(
                ports
                    .iter()
                    .map(|(name, port)| ServicePort {
                        name: Some((*name).to_string()),
                        port: *port,
                        target_port: Some(IntOrString::Int(*port)),
                        ..ServicePort::default()
                    })
                    .collect(),
            ),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

/// Ingress routing every path on `host` to `service_name:port`
///
/// A missing `class_name` is written as a missing class.
pub fn ingress(
    labels: BTreeMap<String, String>,
    host: &str,
    class_name: Option<String>,
    service_name: &str,
    port: i32,
) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            labels: Some(labels),
            ..ObjectMeta::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: class_name,
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service_name.to_string(),
                                port: Some(ServiceBackendPort {
                                    number: Some(port),
                                    ..ServiceBackendPort::default()
                                }),
                            }),
                            ..IngressBackend::default()
                        },
                    }],
                }),
            }]),
            ..IngressSpec::default()
        }),
        ..Ingress::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_class_is_not_guessed() {
        let ingress = ingress(BTreeMap::new(), "git.example.com", None, "git-gitea-http", 3000);
        let spec = ingress.spec.unwrap();
        assert!(spec.ingress_class_name.is_none());
        let rules = spec.rules.unwrap();
        let rule = &rules[0];
        assert_eq!(rule.host.as_deref(), Some("git.example.com"));
    }

    #[test]
    fn test_service_targets_same_port() {
        let service = service(BTreeMap::new(), BTreeMap::new(), "ClusterIP", &[("http", 3000)]);
        let ports = service.spec.unwrap().ports.unwrap();
        let port = &ports[0];
        assert_eq!(port.port, 3000);
        assert_eq!(port.target_port, Some(IntOrString::Int(3000)));
    }
}
