//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// API group of every primary resource served by this operator
pub const API_GROUP: &str = "app-operator.io";

/// Name written to `app.kubernetes.io/managed-by` on every dependent
pub const OPERATOR_NAME: &str = "app-operator";

/// Default field manager used for server-side apply
pub const DEFAULT_FIELD_MANAGER: &str = "app-operator";

/// Default namespace the operator runs in (overridden by `POD_NAMESPACE`)
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "app-operator-system";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default interval between periodic reconciliations of a healthy primary (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Default Fibonacci backoff floor after a failed reconciliation (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;

/// Default Fibonacci backoff ceiling after repeated failures (minutes)
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

// Operator configuration entity

/// Name of the ConfigMap holding operator-wide settings
pub const CONFIG_MAP_NAME: &str = "app-operator-config";

/// Marker label carried by the operator configuration ConfigMap
pub const CONFIG_MAP_LABEL: &str = "app-operator.io/config";

// Standard Kubernetes labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/

/// Name of the application a dependent belongs to (e.g. `gitea`)
pub const LABEL_NAME: &str = "app.kubernetes.io/name";

/// Name of the primary instance a dependent belongs to
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";

/// Tool managing the dependent
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

// Cluster inspection markers

/// Annotation marking an IngressClass as the cluster default
pub const DEFAULT_INGRESS_CLASS_ANNOTATION: &str = "ingressclass.kubernetes.io/is-default-class";

/// Node label present on EKS managed node groups
pub const NODE_LABEL_AWS: &str = "eks.amazonaws.com/nodegroup";

/// Node label set by the Hetzner Cloud CSI driver
pub const NODE_LABEL_HCLOUD: &str = "csi.hetzner.cloud/location";

/// Annotation holding the fingerprint of the desired body a dependent was last written from
pub const DESIRED_HASH_ANNOTATION: &str = "app-operator.io/desired-hash";

/// Length of generated credentials
pub const GENERATED_SECRET_LENGTH: usize = 32;
