//! Gitea Deployment.
//!
//! Init containers prepare the data volume, render `app.ini` from the
//! environment and run migrations before the server starts. Rendering also
//! reads the optional `<name>-gitea-ini` ConfigMap, where users keep extra
//! `GITEA__section__KEY` settings the operator does not generate. When the
//! primary references an admin Secret, one more init container creates the
//! admin user or resets its password.

use super::{
    GiteaConfigMap, GiteaDatabase, GiteaSecret, GiteaVolume, APP_NAME, HTTP_PORT, IMAGE, SSH_PORT,
    WORK_DIR,
};
use crate::apps::labels::{resource_labels, selector_labels};
use crate::crd::{Gitea, LocalObjectReference};
use crate::dependent::Dependent;
use crate::store::ResourceIdentity;
use k8s_openapi::api::apps::v1::{
    Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment,
};
use k8s_openapi::api::core::v1::{
    ConfigMapEnvSource, Container, ContainerPort, EnvFromSource, EnvVar, EnvVarSource,
    HTTPGetAction, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, Probe,
    ResourceRequirements, SecretEnvSource, SecretKeySelector, SecurityContext, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

const DATA_VOLUME: &str = "data";
const DEFAULT_MEMORY_REQUEST: &str = "200Mi";
const DEFAULT_MEMORY_LIMIT: &str = "300Mi";
const GIT_USER: i64 = 1000;

const ADMIN_USER_SCRIPT: &str = "gitea admin user create --admin \\
    --username $GITEA_ADMIN_USER \\
    --password $GITEA_ADMIN_PASSWORD \\
    --email $GITEA_ADMIN_EMAIL \\
    --must-change-password=false \\
  || gitea admin user change-password \\
    --username $GITEA_ADMIN_USER \\
    --password $GITEA_ADMIN_PASSWORD";

#[derive(Debug, Clone, Copy)]
pub struct GiteaDeployment;

impl Dependent<Gitea> for GiteaDeployment {
    const NAME: &'static str = "gitea-deployment";
    type Resource = Deployment;
    type Inputs = ();

    fn identity(&self, primary: &Gitea) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "gitea")
    }

    fn desired(&self, primary: &Gitea, _inputs: ()) -> Deployment {
        let labels = resource_labels(APP_NAME, primary);
        let config_map = GiteaConfigMap.identity(primary).name;
        let ini_config_map = ini_config_map_name(primary);

        let mut init_containers = vec![
            Container {
                name: "chown-data".to_string(),
                image: Some(IMAGE.to_string()),
                command: Some(vec!["chown".to_string()]),
                args: Some(vec!["git:git".to_string(), WORK_DIR.to_string()]),
                volume_mounts: Some(data_mount()),
                ..Container::default()
            },
            Container {
                name: "environment-to-ini".to_string(),
                image: Some(IMAGE.to_string()),
                command: Some(vec!["/bin/sh".to_string()]),
                args: Some(vec![
                    "-c".to_string(),
                    "mkdir -p /data/gitea/conf && environment-to-ini".to_string(),
                ]),
                volume_mounts: Some(data_mount()),
                env_from: Some(vec![
                    config_map_env(&config_map),
                    optional_config_map_env(&ini_config_map),
                    secret_env(&GiteaSecret.identity(primary).name),
                ]),
                env: Some(database_credentials(&GiteaDatabase.app_secret_name(primary))),
                security_context: Some(run_as_git()),
                ..Container::default()
            },
            Container {
                name: "gitea-migrate".to_string(),
                image: Some(IMAGE.to_string()),
                command: Some(vec!["gitea".to_string()]),
                args: Some(vec!["migrate".to_string()]),
                volume_mounts: Some(data_mount()),
                env_from: Some(vec![config_map_env(&config_map)]),
                security_context: Some(run_as_git()),
                ..Container::default()
            },
        ];
        if let Some(admin_secret) = &primary.spec.admin_secret {
            init_containers.push(admin_user_container(&config_map, admin_secret));
        }

        Deployment {
            metadata: ObjectMeta {
                labels: Some(labels.clone()),
                ..ObjectMeta::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(primary.spec.replicas),
                strategy: Some(DeploymentStrategy {
                    type_: Some("RollingUpdate".to_string()),
                    rolling_update: Some(RollingUpdateDeployment {
                        max_surge: Some(IntOrString::Int(1)),
                        max_unavailable: Some(IntOrString::Int(0)),
                    }),
                }),
                selector: LabelSelector {
                    match_labels: Some(selector_labels(APP_NAME, primary)),
                    ..LabelSelector::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..ObjectMeta::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![server_container(primary, &config_map)],
                        init_containers: Some(init_containers),
                        volumes: Some(vec![Volume {
                            name: DATA_VOLUME.to_string(),
                            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                                claim_name: GiteaVolume.identity(primary).name,
                                ..PersistentVolumeClaimVolumeSource::default()
                            }),
                            ..Volume::default()
                        }]),
                        ..PodSpec::default()
                    }),
                },
                ..DeploymentSpec::default()
            }),
            ..Deployment::default()
        }
    }
}

fn server_container(primary: &Gitea, config_map: &str) -> Container {
    let overrides = primary.spec.resources.clone().unwrap_or_default();
    let memory = |value: Option<String>, default: &str| {
        BTreeMap::from([(
            "memory".to_string(),
            Quantity(value.unwrap_or_else(|| default.to_string())),
        )])
    };
    Container {
        name: "gitea".to_string(),
        image: Some(IMAGE.to_string()),
        resources: Some(ResourceRequirements {
            limits: Some(memory(overrides.memory_limit, DEFAULT_MEMORY_LIMIT)),
            requests: Some(memory(overrides.memory_request, DEFAULT_MEMORY_REQUEST)),
            ..ResourceRequirements::default()
        }),
        ports: Some(vec![
            ContainerPort {
                name: Some("http".to_string()),
                container_port: HTTP_PORT,
                ..ContainerPort::default()
            },
            ContainerPort {
                name: Some("ssh".to_string()),
                container_port: SSH_PORT,
                ..ContainerPort::default()
            },
        ]),
        env_from: Some(vec![config_map_env(config_map)]),
        volume_mounts: Some(data_mount()),
        liveness_probe: Some(Probe {
            http_get: Some(HTTPGetAction {
                path: Some("/api/healthz".to_string()),
                port: IntOrString::String("http".to_string()),
                ..HTTPGetAction::default()
            }),
            initial_delay_seconds: Some(200),
            timeout_seconds: Some(5),
            period_seconds: Some(10),
            success_threshold: Some(1),
            failure_threshold: Some(6),
            ..Probe::default()
        }),
        ..Container::default()
    }
}

fn admin_user_container(config_map: &str, admin_secret: &LocalObjectReference) -> Container {
    Container {
        name: "gitea-admin-user".to_string(),
        image: Some(IMAGE.to_string()),
        command: Some(vec!["/bin/sh".to_string()]),
        args: Some(vec!["-c".to_string(), ADMIN_USER_SCRIPT.to_string()]),
        volume_mounts: Some(data_mount()),
        env_from: Some(vec![
            config_map_env(config_map),
            secret_env(&admin_secret.name),
        ]),
        security_context: Some(run_as_git()),
        ..Container::default()
    }
}

fn database_credentials(secret: &str) -> Vec<EnvVar> {
    [("GITEA__database__USER", "username"), ("GITEA__database__PASSWD", "password")]
        .into_iter()
        .map(|(name, key)| EnvVar {
            name: name.to_string(),
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: secret.to_string(),
                    key: key.to_string(),
                    optional: Some(false),
                }),
                ..EnvVarSource::default()
            }),
            ..EnvVar::default()
        })
        .collect()
}

fn data_mount() -> Vec<VolumeMount> {
    vec![VolumeMount {
        name: DATA_VOLUME.to_string(),
        mount_path: WORK_DIR.to_string(),
        ..VolumeMount::default()
    }]
}

fn config_map_env(name: &str) -> EnvFromSource {
    EnvFromSource {
        config_map_ref: Some(ConfigMapEnvSource {
            name: name.to_string(),
            optional: Some(false),
        }),
        ..EnvFromSource::default()
    }
}

/// User-maintained `app.ini` overrides; never written by the operator
pub fn ini_config_map_name(primary: &Gitea) -> String {
    ResourceIdentity::derive(primary, "gitea-ini").name
}

fn optional_config_map_env(name: &str) -> EnvFromSource {
    EnvFromSource {
        config_map_ref: Some(ConfigMapEnvSource {
            name: name.to_string(),
            optional: Some(true),
        }),
        ..EnvFromSource::default()
    }
}

fn secret_env(name: &str) -> EnvFromSource {
    EnvFromSource {
        secret_ref: Some(SecretEnvSource {
            name: name.to_string(),
            optional: Some(false),
        }),
        ..EnvFromSource::default()
    }
}

fn run_as_git() -> SecurityContext {
    SecurityContext {
        run_as_user: Some(GIT_USER),
        run_as_group: Some(GIT_USER),
        ..SecurityContext::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::GiteaSpec;
    use crate::dependent::{ConvergenceEngine, Outcome};
    use crate::settings::ConfigService;
    use crate::store::{InMemoryStore, StateStore};
    use std::sync::Arc;

    fn init_container_names(deployment: &Deployment) -> Vec<String> {
        deployment
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref())
            .and_then(|s| s.init_containers.as_ref())
            .map(|c| c.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_without_admin_secret_has_three_init_containers() {
        let gitea = Gitea::new("git", GiteaSpec::new("git.example.com"));
        let deployment = GiteaDeployment.desired(&gitea, ());
        assert_eq!(
            init_container_names(&deployment),
            vec!["chown-data", "environment-to-ini", "gitea-migrate"]
        );
    }

    #[test]
    fn test_admin_secret_adds_admin_user_step() {
        let mut spec = GiteaSpec::new("git.example.com");
        spec.admin_secret = Some(LocalObjectReference {
            name: "gitea-admin".to_string(),
        });
        let deployment = GiteaDeployment.desired(&Gitea::new("git", spec), ());

        let names = init_container_names(&deployment);
        assert_eq!(names.last().map(String::as_str), Some("gitea-admin-user"));

        let init_containers = deployment.spec.unwrap().template.spec.unwrap().init_containers.unwrap();
        let admin = &init_containers[3];
        let sources = admin.env_from.as_ref().unwrap();
        assert_eq!(sources[1].secret_ref.as_ref().unwrap().name, "gitea-admin");
    }

    #[tokio::test]
    async fn test_removing_admin_secret_drops_admin_user_step() {
        let store = Arc::new(InMemoryStore::new());
        let config = Arc::new(ConfigService::new(Arc::clone(&store), "operator"));
        let engine = ConvergenceEngine::new(Arc::clone(&store), config);

        let mut gitea = Gitea::new("git", GiteaSpec::new("git.example.com"));
        gitea.metadata.namespace = Some("tools".to_string());
        gitea.metadata.uid = Some("git-uid".to_string());
        gitea.spec.admin_secret = Some(LocalObjectReference {
            name: "gitea-admin".to_string(),
        });
        let created = engine.reconcile(&gitea, &GiteaDeployment).await.unwrap();
        assert_eq!(created, Outcome::Created);

        gitea.spec.admin_secret = None;
        let updated = engine.reconcile(&gitea, &GiteaDeployment).await.unwrap();
        assert_eq!(updated, Outcome::Updated);

        let stored: Deployment = store
            .get(&ResourceIdentity::new("git-gitea", "tools"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            init_container_names(&stored),
            vec!["chown-data", "environment-to-ini", "gitea-migrate"]
        );
    }

    #[test]
    fn test_ini_overrides_are_optional() {
        let gitea = Gitea::new("git", GiteaSpec::new("git.example.com"));
        let deployment = GiteaDeployment.desired(&gitea, ());
        let init_containers = deployment.spec.unwrap().template.spec.unwrap().init_containers.unwrap();
        let sources = init_containers[1].env_from.as_ref().unwrap();

        assert_eq!(sources.len(), 3);
        let ini = sources[1].config_map_ref.as_ref().unwrap();
        assert_eq!(ini.name, "git-gitea-ini");
        assert_eq!(ini.optional, Some(true));
        assert_eq!(sources[0].config_map_ref.as_ref().unwrap().optional, Some(false));
    }

    #[test]
    fn test_database_credentials_come_from_cluster_app_secret() {
        let gitea = Gitea::new("git", GiteaSpec::new("git.example.com"));
        let deployment = GiteaDeployment.desired(&gitea, ());
        let init_containers = deployment.spec.unwrap().template.spec.unwrap().init_containers.unwrap();
        let init = &init_containers[1];
        let env = init.env.as_ref().unwrap();
        let selector = env[0]
            .value_from
            .as_ref()
            .and_then(|v| v.secret_key_ref.as_ref())
            .unwrap();
        assert_eq!(selector.name, "git-gitea-db-app");
        assert_eq!(selector.key, "username");
    }

    #[test]
    fn test_memory_overrides() {
        let mut spec = GiteaSpec::new("git.example.com");
        spec.resources = Some(crate::crd::GiteaResources {
            memory_request: Some("512Mi".to_string()),
            memory_limit: None,
        });
        let deployment = GiteaDeployment.desired(&Gitea::new("git", spec), ());
        let pod = deployment.spec.unwrap().template.spec.unwrap();
        let container = &pod.containers[0];
        let resources = container.resources.as_ref().unwrap();
        assert_eq!(resources.requests.as_ref().unwrap()["memory"].0, "512Mi");
        assert_eq!(resources.limits.as_ref().unwrap()["memory"].0, "300Mi");
    }
}
