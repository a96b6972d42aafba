use std::sync::Arc;

use async_trait::async_trait;
use multisite_core::{ConfigurationKind, TenantId, TenantSettings};

/// Lookup backend for tenant records.
/// Implementations: in-memory (dev, tests), database-backed (external).
///
/// `Ok(None)` means "no such tenant". `Err` means the store itself failed and
/// is surfaced to callers as a retryable error.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Find the id of the tenant that owns a folder name.
    async fn get_tenant_id_by_folder(&self, folder_name: &str) -> anyhow::Result<Option<TenantId>>;

    /// Find the tenant bound to a host name.
    async fn get_tenant_by_host(&self, host: &str) -> anyhow::Result<Option<Arc<TenantSettings>>>;

    /// Fetch a tenant record by id.
    async fn fetch_tenant_by_id(&self, id: TenantId) -> anyhow::Result<Option<Arc<TenantSettings>>>;
}

/// Builds the non-tenant base template for a configuration kind.
pub trait ConfigurationFactory<T>: Send + Sync {
    /// Return a fresh instance populated with defaults (placeholder credentials).
    fn create_template(&self, kind: &ConfigurationKind) -> anyhow::Result<T>;
}
