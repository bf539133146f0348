//! # Status
//!
//! Status written back to primaries after a successful reconciliation.
//!
//! Writing status bumps `resourceVersion`, which the watcher reports as a
//! change. Status is therefore only written when the spec generation moved
//! or a dependent was mutated; steady-state cycles leave the primary alone.

use crate::crd::AppStatus;
use crate::store::NamespacedResource;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;

/// Whether the status of a primary at `generation` needs to be rewritten
#[must_use]
pub fn needs_status_update(current: Option<&AppStatus>, generation: Option<i64>, mutations: usize) -> bool {
    if mutations > 0 {
        return true;
    }
    match current {
        Some(status) => status.observed_generation != generation,
        None => true,
    }
}

/// Status recorded for a primary reconciled at `generation`
#[must_use]
pub fn reconciled_status(generation: Option<i64>) -> AppStatus {
    AppStatus {
        observed_generation: generation,
        last_reconcile_time: Some(chrono::Utc::now().to_rfc3339()),
    }
}

/// Merge-patch the status subresource of `primary`
pub async fn patch_status<P>(client: &Client, primary: &P, status: &AppStatus) -> Result<(), kube::Error>
where
    P: NamespacedResource,
{
    let namespace = primary.namespace().unwrap_or_default();
    let api: Api<P> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "status": status });
    api.patch_status(&primary.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(generation: i64) -> AppStatus {
        AppStatus {
            observed_generation: Some(generation),
            last_reconcile_time: Some("2024-01-01T00:00:00Z".to_string()),
        }
    }

    #[test]
    fn test_first_reconcile_writes_status() {
        assert!(needs_status_update(None, Some(1), 0));
    }

    #[test]
    fn test_steady_state_leaves_status_alone() {
        assert!(!needs_status_update(Some(&status(3)), Some(3), 0));
    }

    #[test]
    fn test_new_generation_writes_status() {
        assert!(needs_status_update(Some(&status(3)), Some(4), 0));
    }

    #[test]
    fn test_mutation_writes_status() {
        assert!(needs_status_update(Some(&status(3)), Some(3), 2));
    }

    #[test]
    fn test_reconciled_status_records_generation() {
        let status = reconciled_status(Some(7));
        assert_eq!(status.observed_generation, Some(7));
        let time = status.last_reconcile_time.unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&time).is_ok());
    }
}
