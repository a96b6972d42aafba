//! Tenant-scoped configuration.
//!
//! - **Builder** (`builder`): the [`TenantOptionsBuilder`] seam that applies a
//!   tenant's overrides onto a base template
//! - **Cache** (`cache`): [`TenantOptionsCache`], one built instance per
//!   configuration kind and tenant, with explicit invalidation
//! - **Providers** (`provider`): external identity provider options, their
//!   placeholder factory, and the credential-applying builder

pub mod builder;
pub mod cache;
pub mod provider;

pub use builder::{TenantOptionsBuilder, TenantOverride};
pub use cache::TenantOptionsCache;
pub use provider::{
    provider_options_cache, DefaultProviderFactory, ExternalProviderOptions,
    ExternalProviderOptionsBuilder, ProviderOptionsCache, EXTERNAL_SIGN_IN_SCHEME,
    PLACEHOLDER_CREDENTIAL,
};
