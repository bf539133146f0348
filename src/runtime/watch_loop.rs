//! # Watch Loop
//!
//! Runs a controller for one primary kind. Changes to the primary, and to
//! any dependent it owns, trigger a reconciliation of the primary.

use crate::apps::Application;
use crate::controller::reconciler::{reconcile, Context};
use crate::crd::{Gitea, MariaDB, MariaDBUser, Matomo, MinioBucket, PostgresCluster};
use crate::runtime::error_policy::handle_reconciliation_error;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::Api;
use kube::Client;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Watch `primaries` until a shutdown signal arrives
///
/// `owns` registers the dependent kinds whose changes map back to their
/// owning primary through the controller owner reference.
pub async fn run_controller<A, F>(primaries: Api<A>, ctx: Arc<Context>, owns: F)
where
    A: Application,
    F: FnOnce(Controller<A>, &kube::Client) -> Controller<A>,
{
    let kind = A::kind(&()).to_string();
    info!("Starting {} controller", kind);

    let controller = Controller::new(primaries, watcher::Config::default().any_semantic());
    let controller = owns(controller, ctx.client());

    controller
        .shutdown_on_signal()
        .run(reconcile::<A>, handle_reconciliation_error::<A>, ctx)
        .for_each(|result| {
            match result {
                Ok((object, _)) => debug!("Reconciled {}", object),
                Err(e) => warn!("Controller event failed: {}", e),
            }
            futures::future::ready(())
        })
        .await;

    info!("{} controller stopped", kind);
}

/// Register an owned dependent kind watched across all namespaces
pub fn owned<A, K>(controller: Controller<A>, client: &Client) -> Controller<A>
where
    A: Application,
    K: kube::Resource<DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    controller.owns(Api::<K>::all(client.clone()), watcher::Config::default())
}

/// Run the Gitea, Matomo and MinIO bucket controllers until shutdown
pub async fn run_controllers(client: Client, ctx: Arc<Context>) {
    let gitea = run_controller(Api::<Gitea>::all(client.clone()), Arc::clone(&ctx), |c, client| {
        let c = owned::<_, ConfigMap>(c, client);
        let c = owned::<_, Secret>(c, client);
        let c = owned::<_, PersistentVolumeClaim>(c, client);
        let c = owned::<_, PostgresCluster>(c, client);
        let c = owned::<_, Deployment>(c, client);
        let c = owned::<_, Service>(c, client);
        owned::<_, Ingress>(c, client)
    });

    let matomo = run_controller(Api::<Matomo>::all(client.clone()), Arc::clone(&ctx), |c, client| {
        let c = owned::<_, ConfigMap>(c, client);
        let c = owned::<_, Secret>(c, client);
        let c = owned::<_, MariaDB>(c, client);
        let c = owned::<_, MariaDBUser>(c, client);
        let c = owned::<_, Deployment>(c, client);
        let c = owned::<_, Service>(c, client);
        owned::<_, Ingress>(c, client)
    });

    let minio = run_controller(Api::<MinioBucket>::all(client), ctx, |c, client| {
        owned::<_, Secret>(c, client)
    });

    futures::join!(gitea, matomo, minio);
}
