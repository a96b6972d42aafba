//! Error types for tenant resolution and tenant-scoped configuration.

use std::fmt;

use crate::key::ConfigurationKind;

/// The lookup that failed to match a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantLookup {
    Folder(String),
    Host(String),
}

impl fmt::Display for TenantLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder(folder) => write!(f, "folder `{folder}`"),
            Self::Host(host) => write!(f, "host `{host}`"),
        }
    }
}

/// Errors returned by tenant resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No tenant matches the request. Expected before the first tenant is
    /// provisioned; callers route to onboarding instead of an error page.
    #[error("no tenant matches {lookup}")]
    NotResolved { lookup: TenantLookup },
    /// The tenant store failed or timed out. Retryable.
    #[error("tenant store unavailable: {0:#}")]
    StoreUnavailable(#[source] anyhow::Error),
}

impl ResolveError {
    /// True for the bootstrap "no tenant yet" condition.
    #[must_use]
    pub fn is_not_resolved(&self) -> bool {
        matches!(self, Self::NotResolved { .. })
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

/// Errors raised while building tenant-scoped configuration.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// A build was requested without a tenant. Logged, never returned from a
    /// cache lookup: the build degrades to the unmodified template.
    #[error("no tenant context available while building `{kind}` options")]
    MissingTenantContext { kind: ConfigurationKind },
    #[error("failed to create `{kind}` template: {source:#}")]
    Factory {
        kind: ConfigurationKind,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid `{kind}` options: {reason}")]
    InvalidOptions {
        kind: ConfigurationKind,
        reason: String,
    },
}
