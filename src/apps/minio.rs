//! # MinIO Bucket
//!
//! Basic-auth credentials for the user of a [`MinioBucket`]. The Secret is
//! only managed while the primary does not bring its own `userSecret`.

use super::labels::resource_labels;
use super::secret::{generated_secret, GeneratedValues, BASIC_AUTH};
use super::{Application, WorkflowReport};
use crate::crd::{AppStatus, MinioBucket};
use crate::dependent::{Collaborators, ConvergeError, ConvergenceEngine, Dependent};
use crate::settings::ConfigError;
use crate::store::{ResourceIdentity, StateStore};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::collections::BTreeMap;

pub const APP_NAME: &str = "minio-bucket";
pub const USERNAME_KEY: &str = "username";
pub const PASSWORD_KEY: &str = "password";

impl MinioBucket {
    /// Bucket name on the shared tenant, unique across namespaces
    pub fn bucket_name(&self) -> String {
        format!(
            "{}-{}",
            self.namespace().unwrap_or_else(|| "default".to_string()),
            self.name_any()
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MinioBucketSecret;

#[async_trait]
impl Dependent<MinioBucket> for MinioBucketSecret {
    const NAME: &'static str = "minio-bucket-secret";
    type Resource = Secret;
    type Inputs = GeneratedValues;

    fn identity(&self, primary: &MinioBucket) -> ResourceIdentity {
        ResourceIdentity::derive(primary, "bucket")
    }

    fn is_managed(&self, primary: &MinioBucket, _observed: Option<&Secret>) -> bool {
        primary.spec.user_secret.is_none()
    }

    async fn collect<S: StateStore>(
        &self,
        _primary: &MinioBucket,
        observed: Option<&Secret>,
        _collaborators: &Collaborators<'_, S>,
    ) -> Result<GeneratedValues, ConfigError> {
        Ok(GeneratedValues::retain_or_generate(observed, &[PASSWORD_KEY]))
    }

    fn desired(&self, primary: &MinioBucket, inputs: GeneratedValues) -> Secret {
        generated_secret(
            resource_labels(APP_NAME, primary),
            BASIC_AUTH,
            inputs,
            BTreeMap::from([(USERNAME_KEY.to_string(), primary.bucket_name())]),
        )
    }
}

#[async_trait]
impl Application for MinioBucket {
    const APP_NAME: &'static str = APP_NAME;

    fn status(&self) -> Option<&AppStatus> {
        self.status.as_ref()
    }

    async fn converge<S: StateStore>(
        &self,
        engine: &ConvergenceEngine<S>,
    ) -> Result<WorkflowReport, ConvergeError> {
        let mut report = WorkflowReport::new();
        report.step(engine, self, &MinioBucketSecret).await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{LocalObjectReference, MinioBucketSpec};

    fn bucket(user_secret: Option<&str>) -> MinioBucket {
        let mut bucket = MinioBucket::new(
            "assets",
            MinioBucketSpec {
                user_secret: user_secret.map(|name| LocalObjectReference {
                    name: name.to_string(),
                }),
            },
        );
        bucket.metadata.namespace = Some("web".to_string());
        bucket
    }

    #[test]
    fn test_managed_only_without_user_secret() {
        assert!(MinioBucketSecret.is_managed(&bucket(None), None));
        assert!(!MinioBucketSecret.is_managed(&bucket(Some("own-credentials")), None));
    }

    #[test]
    fn test_username_is_bucket_name() {
        let secret = MinioBucketSecret.desired(
            &bucket(None),
            GeneratedValues::from([(PASSWORD_KEY, "s3cr3t")]),
        );
        let data = secret.data.unwrap();
        assert_eq!(data[USERNAME_KEY].0, b"web-assets".to_vec());
        assert_eq!(data[PASSWORD_KEY].0, b"s3cr3t".to_vec());
        assert_eq!(secret.type_.as_deref(), Some(BASIC_AUTH));
    }
}
