//! # Controller
//!
//! Reconciliation of primaries as driven by the controller runtime.
//!
//! - `backoff`: Fibonacci backoff for failing primaries
//! - `reconciler`: per-primary reconcile entry point and its context
//! - `status`: status written back to primaries

pub mod backoff;
pub mod reconciler;
pub mod status;
