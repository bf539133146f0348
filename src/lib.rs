//! App Operator Library
//!
//! Reconciliation core of an operator that keeps the dependent resources of
//! declared applications (Gitea, Matomo, MinIO buckets) converged with what
//! their primaries ask for.
//!
//! ## Quick Start
//!
//! ```rust
//! use app_operator::prelude::*;
//! ```
//!
//! - `store`: typed access to cluster state, live or in memory
//! - `dependent`: the convergence engine and the `Dependent` contract
//! - `settings`: operator-wide configuration and cluster inspection
//! - `apps`: concrete dependents and workflows per primary kind
//! - `controller`, `runtime`: reconcile entry point and controller wiring

pub mod apps;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod dependent;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod server;
pub mod settings;
pub mod store;
