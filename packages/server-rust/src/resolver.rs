//! Request-to-tenant resolution.
//!
//! [`TenantResolver`] maps a request's path (folder mode) or host (host mode)
//! to a [`TenantContext`]. It keeps no per-request state: one instance is
//! shared by every concurrent request, and each call works only on its
//! arguments. Resolved identities are never cached here; only configuration
//! derived from them is (see [`crate::options`]).

use std::future::Future;
use std::sync::Arc;

use multisite_core::{
    first_folder_segment, MultiTenantOptions, ResolutionMode, ResolveError, TenantContext,
    TenantLookup, TenantSettings, ROOT_FOLDER_NAME,
};
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::traits::TenantStore;

/// Folder name a request path resolves to, with the root substitution applied.
#[must_use]
pub fn tenant_folder_for_path(path: &str) -> String {
    let segment = first_folder_segment(path);
    if segment.is_empty() {
        ROOT_FOLDER_NAME.to_string()
    } else {
        segment
    }
}

/// Resolves requests to tenants against a [`TenantStore`].
pub struct TenantResolver {
    store: Arc<dyn TenantStore>,
    config: ResolverConfig,
}

impl TenantResolver {
    #[must_use]
    pub fn new(store: Arc<dyn TenantStore>, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// The process-wide options stamped onto every resolved context.
    #[must_use]
    pub fn options(&self) -> MultiTenantOptions {
        self.config.options
    }

    /// Resolves the tenant for one request.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NotResolved`] when no tenant matches (bootstrap state).
    /// - [`ResolveError::StoreUnavailable`] when a store lookup fails or
    ///   exceeds the configured lookup timeout.
    pub async fn resolve(&self, path: &str, host: &str) -> Result<TenantContext, ResolveError> {
        let result = match self.config.options.mode {
            ResolutionMode::FolderName => self.resolve_by_folder(path).await,
            ResolutionMode::HostName => self.resolve_by_host(host).await,
        };

        let outcome = match &result {
            Ok(ctx) => {
                debug!(tenant_id = %ctx.id(), folder = ctx.folder_name(), "tenant resolved");
                "resolved"
            }
            Err(err @ ResolveError::NotResolved { .. }) => {
                info!(path, host, error = %err, "tenant not resolved");
                "not_resolved"
            }
            Err(err @ ResolveError::StoreUnavailable(_)) => {
                warn!(path, host, error = %err, "tenant store unavailable");
                "store_unavailable"
            }
        };
        metrics::counter!("multisite_tenant_resolutions_total", "outcome" => outcome).increment(1);

        result
    }

    async fn resolve_by_folder(&self, path: &str) -> Result<TenantContext, ResolveError> {
        let folder = tenant_folder_for_path(path);
        let not_resolved = || ResolveError::NotResolved {
            lookup: TenantLookup::Folder(folder.clone()),
        };

        let id = self
            .bounded(self.store.get_tenant_id_by_folder(&folder))
            .await?
            .ok_or_else(not_resolved)?;
        // The tenant may have been removed between the two lookups.
        let settings = self
            .bounded(self.store.fetch_tenant_by_id(id))
            .await?
            .ok_or_else(not_resolved)?;

        Ok(self.context(settings))
    }

    async fn resolve_by_host(&self, host: &str) -> Result<TenantContext, ResolveError> {
        let settings = self
            .bounded(self.store.get_tenant_by_host(host))
            .await?
            .ok_or_else(|| ResolveError::NotResolved {
                lookup: TenantLookup::Host(host.to_string()),
            })?;

        Ok(self.context(settings))
    }

    fn context(&self, settings: Arc<TenantSettings>) -> TenantContext {
        TenantContext::new(settings, self.config.options)
    }

    /// Runs a store lookup under the configured timeout.
    async fn bounded<T>(
        &self,
        lookup: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, ResolveError> {
        let outcome = match self.config.lookup_timeout {
            Some(limit) => match tokio::time::timeout(limit, lookup).await {
                Ok(outcome) => outcome,
                Err(_elapsed) => Err(anyhow::anyhow!(
                    "tenant store lookup timed out after {}ms",
                    limit.as_millis()
                )),
            },
            None => lookup.await,
        };
        outcome.map_err(ResolveError::StoreUnavailable)
    }
}
