//! Applying tenant overrides onto a configuration template.

use multisite_core::{ConfigurationKind, OptionsError, TenantContext};

/// Result of applying a tenant's overrides to a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantOverride<T> {
    /// The tenant customized the template; this is the customized copy.
    Applied(T),
    /// The tenant has nothing to override; use the template as-is.
    NoOverride,
}

impl<T> TenantOverride<T> {
    /// Resolves the outcome to a concrete instance, falling back to `template`.
    pub fn or_template(self, template: T) -> T {
        match self {
            Self::Applied(customized) => customized,
            Self::NoOverride => template,
        }
    }
}

/// Customizes a base template for one tenant.
///
/// Implementations must be pure functions of `(kind, template, tenant)`:
/// the options cache may call them more than once for the same key when
/// lookups race, and keeps only one result.
pub trait TenantOptionsBuilder<T>: Send + Sync {
    /// Apply `tenant`'s overrides for `kind` to `template`.
    ///
    /// A missing tenant is not an error: implementations log it and return
    /// [`TenantOverride::NoOverride`].
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::InvalidOptions`] if the template cannot be
    /// customized.
    fn build(
        &self,
        kind: &ConfigurationKind,
        template: &T,
        tenant: Option<&TenantContext>,
    ) -> Result<TenantOverride<T>, OptionsError>;
}
