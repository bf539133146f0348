//! Cloud providers the operator knows how to tailor dependents for.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudProvider {
    Aws,
    Hcloud,
    Generic,
}

impl CloudProvider {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Hcloud => "hcloud",
            CloudProvider::Generic => "generic",
        }
    }

    /// Storage class to request for volumes; `None` defers to the cluster default
    #[must_use]
    pub fn default_storage_class(&self) -> Option<&'static str> {
        match self {
            CloudProvider::Aws => Some("gp2"),
            CloudProvider::Hcloud => Some("hcloud-volumes"),
            CloudProvider::Generic => None,
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown cloud provider '{0}' (expected one of: aws, hcloud, generic)")]
pub struct ParseCloudProviderError(pub String);

impl FromStr for CloudProvider {
    type Err = ParseCloudProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(CloudProvider::Aws),
            "hcloud" => Ok(CloudProvider::Hcloud),
            "generic" => Ok(CloudProvider::Generic),
            _ => Err(ParseCloudProviderError(s.to_string())),
        }
    }
}
