//! Matomo Service and Ingress.

use super::{APP_NAME, HTTP_PORT};
use crate::apps::labels::{resource_labels, selector_labels};
use crate::apps::network::{ingress, resolve_ingress_class, service, IngressInputs};
use crate::crd::Matomo;
use crate::dependent::{Collaborators, Dependent};
use crate::settings::ConfigError;
use crate::store::{ResourceIdentity, StateStore};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;

#[derive(Debug, Clone, Copy)]
pub struct MatomoService;

impl Dependent<Matomo> for MatomoService {
    const NAME: &'static str = "matomo-service";
    type Resource = Service;
    type Inputs = ();

    fn identity(&self, primary: &Matomo) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "matomo")
    }

    fn desired(&self, primary: &Matomo, _inputs: ()) -> Service {
        service(
            resource_labels(APP_NAME, primary),
            selector_labels(APP_NAME, primary),
            "ClusterIP",
            &[("http", HTTP_PORT)],
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MatomoIngress;

#[async_trait]
impl Dependent<Matomo> for MatomoIngress {
    const NAME: &'static str = "matomo-ingress";
    type Resource = Ingress;
    type Inputs = IngressInputs;

    fn identity(&self, primary: &Matomo) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "matomo")
    }

    async fn collect<S: StateStore>(
        &self,
        _primary: &Matomo,
        _observed: Option<&Ingress>,
        collaborators: &Collaborators<'_, S>,
    ) -> Result<IngressInputs, ConfigError> {
        resolve_ingress_class(collaborators).await
    }

    fn desired(&self, primary: &Matomo, inputs: IngressInputs) -> Ingress {
        ingress(
            resource_labels(APP_NAME, primary),
            &primary.spec.host,
            inputs.class_name,
            &MatomoService.identity(primary).name,
            HTTP_PORT,
        )
    }
}
