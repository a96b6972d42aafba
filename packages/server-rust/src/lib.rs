//! `multisite` server — tenant resolution, tenant-scoped options caching, and
//! the axum middleware that ties them to the request pipeline.

pub mod config;
pub mod network;
pub mod options;
pub mod resolver;
pub mod storage;
pub mod telemetry;
pub mod traits;

pub use config::{MultiTenantArgs, ResolverConfig, TenantMiddlewareConfig};
pub use options::{
    provider_options_cache, ExternalProviderOptions, ProviderOptionsCache, TenantOptionsBuilder,
    TenantOptionsCache, TenantOverride,
};
pub use resolver::TenantResolver;
pub use storage::InMemoryTenantStore;
pub use traits::{ConfigurationFactory, TenantStore};
