//! # Runtime
//!
//! Wiring between the kube controller runtime and the reconciler.
//!
//! - `initialization`: process start-up and the shared reconciliation context
//! - `error_policy`: requeue failing primaries with per-primary backoff
//! - `watch_loop`: one controller per primary kind, watching owned dependents

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
