//! # Dependents
//!
//! The reconciliation model for resources derived from a primary.
//!
//! A [`Dependent`] describes one kind of derived resource: where it lives
//! ([`Dependent::identity`]), whether it is managed at all for a given primary
//! ([`Dependent::is_managed`]), which outside values it needs
//! ([`Dependent::collect`]) and what it should look like
//! ([`Dependent::desired`]). The [`ConvergenceEngine`] drives the store toward
//! that description.
//!
//! - `identity` - naming rules and discriminating [`Role`]s
//! - `matcher` - managed-field comparison of desired and observed bodies
//! - `engine` - observe, gate, compute, diff, act

mod engine;
mod identity;
pub mod matcher;

pub use engine::ConvergenceEngine;
pub use identity::Role;

use crate::settings::{ConfigError, ConfigService};
use crate::store::{NamespacedResource, ResourceIdentity, StateStore, StoreError};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Values a dependent may consult while collecting its inputs
#[derive(Debug)]
pub struct Collaborators<'a, S> {
    pub store: &'a S,
    pub config: &'a ConfigService<S>,
}

/// One kind of resource derived from primaries of type `P`
#[async_trait]
pub trait Dependent<P>: Send + Sync
where
    P: NamespacedResource,
{
    /// Short name used in logs and metrics, e.g. `gitea-deployment`
    const NAME: &'static str;

    type Resource: NamespacedResource;

    /// Pre-fetched values `desired` needs beyond the primary itself
    type Inputs: Default + Send + Sync;

    /// Name of this instance in logs and metrics
    ///
    /// Dependents with several roles override this to tell the roles apart.
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Identity this dependent must have for `primary`
    ///
    /// Must be deterministic: the same primary always yields the same identity.
    fn identity(&self, primary: &P) -> ResourceIdentity;

    /// Whether this dependent is managed for `primary` in the current cycle
    ///
    /// When `false` the engine neither creates nor updates the dependent.
    fn is_managed(&self, _primary: &P, _observed: Option<&Self::Resource>) -> bool {
        true
    }

    /// Gather the outside values `desired` needs
    ///
    /// This is the only step allowed to read the store or the operator
    /// configuration. `observed` is the dependent as currently stored, if any.
    async fn collect<S: StateStore>(
        &self,
        _primary: &P,
        _observed: Option<&Self::Resource>,
        _collaborators: &Collaborators<'_, S>,
    ) -> Result<Self::Inputs, ConfigError> {
        Ok(Self::Inputs::default())
    }

    /// Target body for `primary`
    ///
    /// Pure: equal inputs produce equal bodies. The engine stamps identity
    /// and owner reference onto the result, so implementations may leave
    /// name and namespace unset.
    fn desired(&self, primary: &P, inputs: Self::Inputs) -> Self::Resource;
}

/// Result of converging one dependent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
    /// Precondition not met; nothing was written
    Skipped,
}

impl Outcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Created => "created",
            Outcome::Updated => "updated",
            Outcome::Unchanged => "unchanged",
            Outcome::Skipped => "skipped",
        }
    }

    /// Whether the store was written to
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(self, Outcome::Created | Outcome::Updated)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store call that failed during convergence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Observe,
    Create,
    Update,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Observe => "observe",
            Action::Create => "create",
            Action::Update => "update",
        })
    }
}

#[derive(Debug, Error)]
pub enum ConvergeError {
    #[error("Failed to {action} {kind} {identity}: {source}")]
    Store {
        action: Action,
        kind: String,
        identity: ResourceIdentity,
        #[source]
        source: StoreError,
    },

    #[error("Failed to collect inputs for {dependent}: {source}")]
    Collect {
        dependent: &'static str,
        #[source]
        source: ConfigError,
    },

    #[error("Failed to compare {kind} {identity}: {source}")]
    Compare {
        kind: String,
        identity: ResourceIdentity,
        #[source]
        source: serde_json::Error,
    },
}

impl ConvergeError {
    /// Whether retrying the same cycle later may succeed without user action
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ConvergeError::Store { source, .. } => !matches!(source, StoreError::Serialization { .. }),
            ConvergeError::Collect { source, .. } => matches!(source, ConfigError::Store(_)),
            ConvergeError::Compare { .. } => false,
        }
    }
}
