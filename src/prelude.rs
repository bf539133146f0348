//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use app_operator::prelude::*;
//! ```

// Primary kinds and their specs
pub use crate::crd::*;

// Convergence core
pub use crate::apps::{Application, WorkflowReport};
pub use crate::dependent::{
    Action, Collaborators, ConvergeError, ConvergenceEngine, Dependent, Outcome, Role,
};
pub use crate::store::{
    InMemoryStore, KubeStore, LabelSelector, ResourceIdentity, StateStore, StoreError,
};

// Operator configuration
pub use crate::config::ControllerConfig;
pub use crate::settings::{CloudProvider, ConfigError, ConfigKey, ConfigService};

pub use crate::controller::reconciler::{reconcile, Context, ReconcilerError};
