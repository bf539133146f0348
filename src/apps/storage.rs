//! # Storage
//!
//! Volume claims and the storage class resolution they share.

use crate::crd::StorageSpec;
use crate::dependent::Collaborators;
use crate::settings::ConfigError;
use crate::store::StateStore;
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// Inputs of a dependent that provisions a volume
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageInputs {
    /// `None` leaves the choice to the cluster default class
    pub storage_class: Option<String>,
}

/// Storage class for a volume of a primary with `storage` overrides
///
/// An explicit class wins; otherwise the detected cloud provider decides.
pub async fn resolve_storage_class<S: StateStore>(
    storage: Option<&StorageSpec>,
    collaborators: &Collaborators<'_, S>,
) -> Result<StorageInputs, ConfigError> {
    if let Some(class) = storage.and_then(|s| s.storage_class_name.clone()) {
        return Ok(StorageInputs {
            storage_class: Some(class),
        });
    }
    let provider = collaborators.config.cloud_provider().await?;
    Ok(StorageInputs {
        storage_class: provider.default_storage_class().map(str::to_string),
    })
}

/// Requested size from `storage`, or `default` when unset
pub fn size_or(storage: Option<&StorageSpec>, default: &str) -> String {
    storage
        .and_then(|s| s.size.clone())
        .unwrap_or_else(|| default.to_string())
}

/// Single-writer claim of `size`
pub fn persistent_volume_claim(
    labels: BTreeMap<String, String>,
    size: String,
    storage_class: Option<String>,
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            labels: Some(labels),
            ..ObjectMeta::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            storage_class_name: storage_class,
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([("storage".to_string(), Quantity(size))])),
                ..VolumeResourceRequirements::default()
            }),
            ..PersistentVolumeClaimSpec::default()
        }),
        ..PersistentVolumeClaim::default()
    }
}
