//! Gitea Services and Ingress.
//!
//! HTTP and SSH are served by two Services of the same kind, told apart by
//! their [`ServiceRole`].

use super::{APP_NAME, HTTP_PORT, SSH_PORT};
use crate::apps::labels::{resource_labels, selector_labels};
use crate::apps::network::{ingress, resolve_ingress_class, service, IngressInputs};
use crate::crd::Gitea;
use crate::dependent::{Collaborators, Dependent, Role};
use crate::settings::ConfigError;
use crate::store::{ResourceIdentity, StateStore};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceRole {
    Http,
    Ssh,
}

impl ServiceRole {
    pub const ALL: [ServiceRole; 2] = [ServiceRole::Http, ServiceRole::Ssh];
}

impl Role for ServiceRole {
    fn discriminator(&self) -> &'static str {
        match self {
            ServiceRole::Http => "http",
            ServiceRole::Ssh => "ssh",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GiteaService(pub ServiceRole);

impl Dependent<Gitea> for GiteaService {
    const NAME: &'static str = "gitea-service";
    type Resource = Service;
    type Inputs = ();

    fn name(&self) -> &'static str {
        match self.0 {
            ServiceRole::Http => "gitea-http-service",
            ServiceRole::Ssh => "gitea-ssh-service",
        }
    }

    fn identity(&self, primary: &Gitea) -> ResourceIdentity {
        ResourceIdentity::derive_for_role(primary, "gitea", self.0)
    }

    fn desired(&self, primary: &Gitea, _inputs: ()) -> Service {
        let (type_, port) = match self.0 {
            ServiceRole::Http => ("ClusterIP", ("http", HTTP_PORT)),
            ServiceRole::Ssh => ("LoadBalancer", ("ssh", SSH_PORT)),
        };
        service(
            resource_labels(APP_NAME, primary),
            selector_labels(APP_NAME, primary),
            type_,
            &[port],
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GiteaIngress;

#[async_trait]
impl Dependent<Gitea> for GiteaIngress {
    const NAME: &'static str = "gitea-ingress";
    type Resource = Ingress;
    type Inputs = IngressInputs;

    fn identity(&self, primary: &Gitea) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "gitea")
    }

    async fn collect<S: StateStore>(
        &self,
        _primary: &Gitea,
        _observed: Option<&Ingress>,
        collaborators: &Collaborators<'_, S>,
    ) -> Result<IngressInputs, ConfigError> {
        resolve_ingress_class(collaborators).await
    }

    fn desired(&self, primary: &Gitea, inputs: IngressInputs) -> Ingress {
        ingress(
            resource_labels(APP_NAME, primary),
            &primary.spec.host,
            inputs.class_name,
            &GiteaService(ServiceRole::Http).identity(primary).name,
            HTTP_PORT,
        )
    }
}
