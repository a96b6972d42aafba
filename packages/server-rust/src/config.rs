//! Process-level configuration for tenant resolution and the request adapter.

use std::time::Duration;

use multisite_core::{MultiTenantOptions, ResolutionMode};

/// Configuration of the [`TenantResolver`](crate::resolver::TenantResolver).
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Resolution mode and related-sites flag, immutable for the process.
    pub options: MultiTenantOptions,
    /// Upper bound on each tenant store lookup. `None` disables the bound and
    /// leaves cancellation to the caller.
    pub lookup_timeout: Option<Duration>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            options: MultiTenantOptions::default(),
            lookup_timeout: Some(Duration::from_secs(5)),
        }
    }
}

/// Configuration of the tenant resolution middleware.
#[derive(Debug, Clone)]
pub struct TenantMiddlewareConfig {
    /// Where unresolved requests are sent while no tenant exists yet.
    pub setup_path: String,
    /// `Retry-After` value sent when the tenant store is unavailable.
    pub retry_after: Duration,
}

impl Default for TenantMiddlewareConfig {
    fn default() -> Self {
        Self {
            setup_path: "/setup".to_string(),
            retry_after: Duration::from_secs(5),
        }
    }
}

/// Command-line / environment arguments for multi-tenancy.
#[derive(Debug, Clone, clap::Args)]
pub struct MultiTenantArgs {
    /// Tenant resolution mode: `folder_name` or `host_name`.
    #[arg(long, env = "MULTISITE_MODE", default_value = "folder_name")]
    pub mode: ResolutionMode,

    /// Share one configuration instance per kind across all tenants.
    #[arg(long, env = "MULTISITE_RELATED_SITES", default_value_t = false)]
    pub related_sites: bool,

    /// Timeout for each tenant store lookup in milliseconds (0 disables it).
    #[arg(long, env = "MULTISITE_LOOKUP_TIMEOUT_MS", default_value_t = 5_000)]
    pub lookup_timeout_ms: u64,
}

impl MultiTenantArgs {
    #[must_use]
    pub fn options(&self) -> MultiTenantOptions {
        MultiTenantOptions {
            mode: self.mode,
            use_related_sites_mode: self.related_sites,
        }
    }

    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            options: self.options(),
            lookup_timeout: (self.lookup_timeout_ms > 0)
                .then(|| Duration::from_millis(self.lookup_timeout_ms)),
        }
    }
}
