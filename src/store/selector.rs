//! # Label Selectors
//!
//! Equality- and existence-based label requirements, rendered in the
//! Kubernetes selector syntax for API calls and evaluated locally by the
//! in-memory store.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// `key` is present, any value
    Exists(String),
    /// `key=value`
    Equals(String, String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Exists(key) => labels.contains_key(key),
            Requirement::Equals(key, value) => labels.get(key) == Some(value),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Exists(key) => write!(f, "{key}"),
            Requirement::Equals(key, value) => write!(f, "{key}={value}"),
        }
    }
}

/// Conjunction of label requirements; the empty selector matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    #[must_use]
    pub fn everything() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn exists(mut self, key: impl Into<String>) -> Self {
        self.requirements.push(Requirement::Exists(key.into()));
        self
    }

    #[must_use]
    pub fn equals(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements
            .push(Requirement::Equals(key.into(), value.into()));
        self
    }

    /// Selector requiring every entry of `labels`
    #[must_use]
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        labels
            .iter()
            .fold(Self::default(), |selector, (k, v)| selector.equals(k, v))
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        let empty = BTreeMap::new();
        let labels = labels.unwrap_or(&empty);
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.requirements.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(","))
    }
}
