//! # Generated Secrets
//!
//! Credentials the operator generates on behalf of an application.
//!
//! Generation happens while collecting inputs, never while computing the
//! desired body: a value already present in the stored Secret is always
//! kept, so converging twice never rotates a credential.

use crate::constants::GENERATED_SECRET_LENGTH;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeMap;

/// Secret type used for generated credentials without a specific layout
pub const OPAQUE: &str = "Opaque";

/// Secret type for username/password pairs
pub const BASIC_AUTH: &str = "kubernetes.io/basic-auth";

/// Generated values of one Secret, keyed by Secret key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedValues(BTreeMap<String, String>);

impl GeneratedValues {
    /// Keep every `keys` value present in `observed` and generate the rest
    pub fn retain_or_generate(observed: Option<&Secret>, keys: &[&str]) -> Self {
        let values = keys
            .iter()
            .map(|key| {
                let value = observed
                    .and_then(|secret| existing_value(secret, key))
                    .unwrap_or_else(generate_password);
                ((*key).to_string(), value)
            })
            .collect();
        Self(values)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for GeneratedValues {
    fn from(values: [(&str, &str); N]) -> Self {
        Self(
            values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// Random alphanumeric credential
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LENGTH)
        .map(char::from)
        .collect()
}

fn existing_value(secret: &Secret, key: &str) -> Option<String> {
    let bytes = secret.data.as_ref()?.get(key)?;
    String::from_utf8(bytes.0.clone())
        .ok()
        .filter(|value| !value.is_empty())
}

/// Secret holding `generated` plus the `fixed` entries
///
/// Fixed entries win over generated ones with the same key.
pub fn generated_secret(
    labels: BTreeMap<String, String>,
    type_: &str,
    generated: GeneratedValues,
    fixed: BTreeMap<String, String>,
) -> Secret {
    let mut data = generated.0;
    data.extend(fixed);
    Secret {
        metadata: ObjectMeta {
            labels: Some(labels),
            ..ObjectMeta::default()
        },
        type_: Some(type_.to_string()),
        data: Some(
            data.into_iter()
                .map(|(key, value)| (key, ByteString(value.into_bytes())))
                .collect(),
        ),
        ..Secret::default()
    }
}
