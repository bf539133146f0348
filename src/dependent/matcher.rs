//! # Desired/Observed Matching
//!
//! Decides whether an observed dependent already satisfies its desired body.
//!
//! The desired body is the set of fields this operator manages: every field
//! it sets must be present and equal in the observed object, while fields the
//! API server or other controllers add (defaults, status, store-generated
//! metadata) are ignored.
//!
//! A field dropped from the desired body is invisible to that comparison, so
//! every written body also carries a [`fingerprint`] of itself. When the
//! desired body changes in any way, including removals, the fingerprint no
//! longer matches the one stored on the observed object.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Metadata written by the store itself, never by a desired body
const STORE_OWNED_METADATA: &[&str] = &[
    "uid",
    "resourceVersion",
    "generation",
    "creationTimestamp",
    "deletionTimestamp",
    "deletionGracePeriodSeconds",
    "managedFields",
    "selfLink",
];

/// `true` when `observed` already carries every field of `desired`
pub fn matches<K: Serialize>(desired: &K, observed: &K) -> Result<bool, serde_json::Error> {
    let mut desired = serde_json::to_value(desired)?;
    let mut observed = serde_json::to_value(observed)?;
    strip_store_metadata(&mut desired);
    strip_store_metadata(&mut observed);
    Ok(is_subset(&desired, &observed))
}

/// SHA-256 of the canonical JSON form of `desired`
///
/// Object keys serialize in sorted order, so equal bodies always produce the
/// same fingerprint.
pub fn fingerprint<K: Serialize>(desired: &K) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(desired)?;
    strip_store_metadata(&mut value);
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&value)?);
    Ok(format!("sha256:{:x}", hasher.finalize()))
}

fn strip_store_metadata(value: &mut Value) {
    if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
        for key in STORE_OWNED_METADATA {
            metadata.remove(*key);
        }
    }
}

fn is_subset(desired: &Value, observed: &Value) -> bool {
    match (desired, observed) {
        (Value::Null, _) => true,
        (Value::Object(wanted), Value::Object(actual)) => wanted.iter().all(|(key, value)| {
            actual
                .get(key)
                .map_or_else(|| is_vacant(value), |present| is_subset(value, present))
        }),
        (Value::Array(wanted), Value::Array(actual)) => {
            wanted.len() == actual.len()
                && wanted.iter().zip(actual).all(|(w, a)| is_subset(w, a))
        }
        (wanted, actual) => wanted == actual,
    }
}

/// Values the API server drops on write
fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_metadata_is_ignored() {
        let desired = json!({"metadata": {"name": "a", "labels": {"x": "1"}}, "data": {"k": "v"}});
        let observed = json!({
            "metadata": {"name": "a", "labels": {"x": "1"}, "uid": "u", "resourceVersion": "7"},
            "data": {"k": "v"}
        });
        assert!(matches(&desired, &observed).unwrap());
    }

    #[test]
    fn test_server_defaults_are_ignored() {
        let desired = json!({"spec": {"ports": [{"port": 22, "name": "ssh"}]}});
        let observed = json!({
            "spec": {"ports": [{"port": 22, "name": "ssh", "protocol": "TCP"}], "clusterIP": "10.0.0.1"},
            "status": {"loadBalancer": {}}
        });
        assert!(matches(&desired, &observed).unwrap());
    }

    #[test]
    fn test_changed_value_is_detected() {
        let desired = json!({"spec": {"replicas": 2}});
        let observed = json!({"spec": {"replicas": 1}});
        assert!(!matches(&desired, &observed).unwrap());
    }

    #[test]
    fn test_array_length_change_is_detected() {
        let desired = json!({"spec": {"initContainers": [{"name": "a"}, {"name": "b"}]}});
        let observed = json!({"spec": {"initContainers": [{"name": "a"}]}});
        assert!(!matches(&desired, &observed).unwrap());
        assert!(!matches(&observed, &desired).unwrap());
    }

    #[test]
    fn test_fingerprint_changes_when_a_key_is_removed() {
        let full = json!({"data": {"a": "1", "b": "2"}});
        let reduced = json!({"data": {"a": "1"}});
        assert_ne!(fingerprint(&full).unwrap(), fingerprint(&reduced).unwrap());
        assert_eq!(fingerprint(&full).unwrap(), fingerprint(&full.clone()).unwrap());
    }

    #[test]
    fn test_fingerprint_ignores_store_metadata() {
        let desired = json!({"metadata": {"name": "a"}, "data": {"k": "v"}});
        let stored = json!({"metadata": {"name": "a", "uid": "u", "resourceVersion": "3"}, "data": {"k": "v"}});
        assert_eq!(fingerprint(&desired).unwrap(), fingerprint(&stored).unwrap());
    }

    #[test]
    fn test_missing_field_is_detected_unless_vacant() {
        let observed = json!({"metadata": {"name": "a"}});
        assert!(!matches(&json!({"metadata": {"name": "a", "labels": {"x": "1"}}}), &observed).unwrap());
        assert!(matches(&json!({"metadata": {"name": "a", "labels": {}}}), &observed).unwrap());
    }
}
