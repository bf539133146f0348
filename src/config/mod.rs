//! # Configuration
//!
//! Process-level settings for the operator binary.
//!
//! Operator-wide *cluster* settings (ingress class, cloud provider) live in
//! [`crate::settings`]; this module only covers what the process reads from
//! its environment at startup.

mod controller;

pub use controller::ControllerConfig;
