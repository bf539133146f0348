//! # Identity Resolution
//!
//! Derives the stable identity a dependent must have for a given primary.
//!
//! The default rule places the dependent in the primary's namespace and
//! names it `<primary>-<suffix>`, where the suffix is fixed per dependent.
//! When one primary owns several dependents of the same kind, each carries a
//! [`Role`] and the name becomes `<primary>-<suffix>-<role>`.

use crate::store::ResourceIdentity;
use kube::ResourceExt;

/// Distinguishes instances of the same dependent kind owned by one primary
pub trait Role: Copy + std::fmt::Debug + Send + Sync {
    /// Token appended to the dependent's name; must be unique per role
    fn discriminator(&self) -> &'static str;
}

impl ResourceIdentity {
    /// Identity of the single dependent `suffix` of `primary`
    pub fn derive<P: ResourceExt>(primary: &P, suffix: &str) -> Self {
        Self::new(
            format!("{}-{}", primary.name_any(), suffix),
            namespace_of(primary),
        )
    }

    /// Identity of the `role` instance of dependent `suffix` of `primary`
    pub fn derive_for_role<P: ResourceExt, R: Role>(primary: &P, suffix: &str, role: R) -> Self {
        Self::new(
            format!("{}-{}-{}", primary.name_any(), suffix, role.discriminator()),
            namespace_of(primary),
        )
    }

    /// Identity of `primary` itself
    pub fn of<P: ResourceExt>(primary: &P) -> Self {
        Self::new(primary.name_any(), namespace_of(primary))
    }
}

fn namespace_of<P: ResourceExt>(primary: &P) -> String {
    primary.namespace().unwrap_or_else(|| "default".to_string())
}
