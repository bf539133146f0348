//! Matomo Deployment.

use super::config::{ARCHIVE_CRON, INIT_SH, INSTALL_JSON};
use super::{MatomoConfigMap, MatomoSecret, APP_NAME, HTTP_PORT, IMAGE};
use crate::apps::labels::{resource_labels, selector_labels};
use crate::crd::Matomo;
use crate::dependent::Dependent;
use crate::store::ResourceIdentity;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapEnvSource, ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource,
    EnvFromSource, KeyToPath, PodSpec, PodTemplateSpec, SecretEnvSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;

const WWW_DATA_VOLUME: &str = "www-data";
const CONFIGURATION_VOLUME: &str = "matomo-configuration";
const CRON_VOLUME: &str = "cron";
const HTML_DIR: &str = "/var/www/html";
const INSTALL_DIR: &str = "/tmp/matomo";
const CRON_DIR: &str = "/etc/cron.d";

#[derive(Debug, Clone, Copy)]
pub struct MatomoDeployment;

impl Dependent<Matomo> for MatomoDeployment {
    const NAME: &'static str = "matomo-deployment";
    type Resource = Deployment;
    type Inputs = ();

    fn identity(&self, primary: &Matomo) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "matomo")
    }

    fn desired(&self, primary: &Matomo, _inputs: ()) -> Deployment {
        let labels = resource_labels(APP_NAME, primary);
        let config_map = MatomoConfigMap.identity(primary).name;
        let env_from = vec![
            EnvFromSource {
                secret_ref: Some(SecretEnvSource {
                    name: MatomoSecret.identity(primary).name,
                    optional: None,
                }),
                ..EnvFromSource::default()
            },
            EnvFromSource {
                config_map_ref: Some(ConfigMapEnvSource {
                    name: config_map.clone(),
                    optional: None,
                }),
                ..EnvFromSource::default()
            },
        ];

        let init = Container {
            name: "matomo-init".to_string(),
            image: Some(IMAGE.to_string()),
            command: Some(vec!["sh".to_string(), format!("{INSTALL_DIR}/{INIT_SH}")]),
            env_from: Some(env_from.clone()),
            volume_mounts: Some(vec![
                mount(WWW_DATA_VOLUME, HTML_DIR, false),
                mount(CONFIGURATION_VOLUME, INSTALL_DIR, true),
            ]),
            ..Container::default()
        };
        let server = Container {
            name: "matomo".to_string(),
            image: Some(IMAGE.to_string()),
            ports: Some(vec![ContainerPort {
                container_port: HTTP_PORT,
                ..ContainerPort::default()
            }]),
            env_from: Some(env_from),
            volume_mounts: Some(vec![
                mount(WWW_DATA_VOLUME, HTML_DIR, false),
                mount(CRON_VOLUME, CRON_DIR, false),
            ]),
            ..Container::default()
        };

        Deployment {
            metadata: ObjectMeta {
                labels: Some(labels.clone()),
                ..ObjectMeta::default()
            },
            spec: Some(DeploymentSpec {
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
                        init_containers: Some(vec![init]),
                        containers: vec![server],
                        volumes: Some(vec![
                            Volume {
                                name: WWW_DATA_VOLUME.to_string(),
                                empty_dir: Some(EmptyDirVolumeSource::default()),
                                ..Volume::default()
                            },
                            config_map_volume(CONFIGURATION_VOLUME, &config_map, &[INSTALL_JSON, INIT_SH]),
                            config_map_volume(CRON_VOLUME, &config_map, &[ARCHIVE_CRON]),
                        ]),
                        ..PodSpec::default()
                    }),
                },
                ..DeploymentSpec::default()
            }),
            ..Deployment::default()
        }
    }
}

fn mount(name: &str, path: &str, read_only: bool) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        read_only: read_only.then_some(true),
        ..VolumeMount::default()
    }
}

/// Volume projecting `keys` of `config_map` as files of the same name
fn config_map_volume(name: &str, config_map: &str, keys: &[&str]) -> Volume {
    Volume {
        name: name.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.to_string(),
            default_mode: Some(0o644),
            items: Some(
                keys.iter()
                    .map(|key| KeyToPath {
                        key: (*key).to_string(),
                        path: (*key).to_string(),
                        mode: None,
                    })
                    .collect(),
            ),
            ..ConfigMapVolumeSource::default()
        }),
        ..Volume::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::MatomoSpec;

    #[test]
    fn test_configuration_volume_projects_install_files() {
        let matomo = Matomo::new(
            "analytics",
            MatomoSpec {
                host: "stats.example.com".to_string(),
                storage: None,
            },
        );
        let deployment = MatomoDeployment.desired(&matomo, ());
        let pod = deployment.spec.unwrap().template.spec.unwrap();
        let volumes = pod.volumes.unwrap();
        let configuration = volumes
            .iter()
            .find(|v| v.name == CONFIGURATION_VOLUME)
            .and_then(|v| v.config_map.as_ref())
            .unwrap();
        assert_eq!(configuration.name, "analytics-matomo-config");
        assert_eq!(configuration.default_mode, Some(420));
        let paths: Vec<_> = configuration
            .items
            .as_ref()
            .unwrap()
            .iter()
            .map(|i| i.path.as_str())
            .collect();
        assert_eq!(paths, vec![INSTALL_JSON, INIT_SH]);
        assert_eq!(pod.init_containers.unwrap()[0].name, "matomo-init");
    }
}
