//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from the deployment manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace the operator runs in; hosts the operator configuration ConfigMap
    pub operator_namespace: String,
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// Interval between periodic reconciliations of a healthy primary (seconds)
    pub resync_interval_secs: u64,
    /// Fibonacci backoff floor (minutes)
    pub backoff_min_minutes: u64,
    /// Fibonacci backoff ceiling (minutes)
    pub backoff_max_minutes: u64,
    /// Field manager name used for server-side apply
    pub field_manager: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` delegates here; tests pass a map instead of mutating the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        use crate::constants::*;
        Self {
            operator_namespace: string_or_default(&lookup, "POD_NAMESPACE", DEFAULT_OPERATOR_NAMESPACE),
            metrics_port: parsed_or_default(&lookup, "METRICS_PORT", DEFAULT_METRICS_PORT),
            resync_interval_secs: parsed_or_default(
                &lookup,
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            ),
            backoff_min_minutes: parsed_or_default(
                &lookup,
                "BACKOFF_MIN_MINUTES",
                DEFAULT_BACKOFF_MIN_MINUTES,
            ),
            backoff_max_minutes: parsed_or_default(
                &lookup,
                "BACKOFF_MAX_MINUTES",
                DEFAULT_BACKOFF_MAX_MINUTES,
            ),
            field_manager: string_or_default(&lookup, "FIELD_MANAGER", DEFAULT_FIELD_MANAGER),
        }
    }

    /// Get resync interval duration
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}

/// Read a value and parse it, or return the default
fn parsed_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a non-empty string value or return the default
fn string_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = ControllerConfig::from_lookup(|_| None);
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.resync_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_values_are_read_from_lookup() {
        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("POD_NAMESPACE", "ops"),
            ("METRICS_PORT", "9090"),
            ("RESYNC_INTERVAL_SECS", "60"),
            ("FIELD_MANAGER", "custom-manager"),
        ]));
        assert_eq!(config.operator_namespace, "ops");
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.resync_interval_secs, 60);
        assert_eq!(config.field_manager, "custom-manager");
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("METRICS_PORT", "not-a-port"),
            ("POD_NAMESPACE", "  "),
        ]));
        assert_eq!(config.metrics_port, crate::constants::DEFAULT_METRICS_PORT);
        assert_eq!(
            config.operator_namespace,
            crate::constants::DEFAULT_OPERATOR_NAMESPACE
        );
    }
}
