//! In-memory [`TenantStore`] implementation.
//!
//! Keeps tenant records plus folder and host indexes behind one lock so the
//! indexes never disagree with the records. Suitable for development, tests,
//! and single-process deployments seeded from a file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use multisite_core::{TenantId, TenantSettings, ROOT_FOLDER_NAME};
use parking_lot::RwLock;
use tracing::info;

use crate::traits::TenantStore;

/// Errors raised when a write would break the store's uniqueness invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("folder `{folder}` is already used by tenant {owner}")]
    DuplicateFolder { folder: String, owner: TenantId },
    #[error("host `{host}` is already used by tenant {owner}")]
    DuplicateHost { host: String, owner: TenantId },
}

/// Index key for a folder name. The empty folder is the root tenant.
fn folder_key(folder_name: &str) -> String {
    let folder = folder_name.trim();
    if folder.is_empty() {
        ROOT_FOLDER_NAME.to_string()
    } else {
        folder.to_ascii_lowercase()
    }
}

fn host_key(host: &str) -> String {
    host.trim().to_ascii_lowercase()
}

#[derive(Default)]
struct Index {
    tenants: HashMap<TenantId, Arc<TenantSettings>>,
    by_folder: HashMap<String, TenantId>,
    by_host: HashMap<String, TenantId>,
}

impl Index {
    fn unindex(&mut self, settings: &TenantSettings) {
        self.by_folder.remove(&folder_key(&settings.folder_name));
        if let Some(host) = &settings.host {
            self.by_host.remove(&host_key(host));
        }
    }
}

/// Tenant store held entirely in memory.
///
/// Folder names and host names are unique and matched case-insensitively.
#[derive(Default)]
pub struct InMemoryTenantStore {
    inner: RwLock<Index>,
}

impl InMemoryTenantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `tenants`.
    ///
    /// # Errors
    ///
    /// Returns the first uniqueness violation among `tenants`.
    pub fn from_tenants(
        tenants: impl IntoIterator<Item = TenantSettings>,
    ) -> Result<Self, StoreError> {
        let store = Self::new();
        for tenant in tenants {
            store.upsert(tenant)?;
        }
        Ok(store)
    }

    /// Loads a store from a JSON array of tenant records.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if two
    /// records share a folder or host.
    pub async fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading tenants from {}", path.display()))?;
        let tenants: Vec<TenantSettings> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing tenants from {}", path.display()))?;
        let store = Self::from_tenants(tenants)?;
        info!(tenants = store.len(), path = %path.display(), "tenant store loaded");
        Ok(store)
    }

    /// Inserts or replaces a tenant, re-indexing its folder and host.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if another tenant already owns the folder or host.
    pub fn upsert(&self, settings: TenantSettings) -> Result<(), StoreError> {
        let mut index = self.inner.write();
        let id = settings.id;

        let folder = folder_key(&settings.folder_name);
        if let Some(&owner) = index.by_folder.get(&folder) {
            if owner != id {
                return Err(StoreError::DuplicateFolder { folder, owner });
            }
        }
        let host = settings.host.as_deref().map(host_key);
        if let Some(host) = &host {
            if let Some(&owner) = index.by_host.get(host) {
                if owner != id {
                    return Err(StoreError::DuplicateHost {
                        host: host.clone(),
                        owner,
                    });
                }
            }
        }

        if let Some(previous) = index.tenants.remove(&id) {
            index.unindex(&previous);
        }
        index.by_folder.insert(folder, id);
        if let Some(host) = host {
            index.by_host.insert(host, id);
        }
        index.tenants.insert(id, Arc::new(settings));
        Ok(())
    }

    /// Removes a tenant. Returns the removed record, if any.
    pub fn remove(&self, id: TenantId) -> Option<Arc<TenantSettings>> {
        let mut index = self.inner.write();
        let removed = index.tenants.remove(&id)?;
        index.unindex(&removed);
        Some(removed)
    }

    /// Snapshot of all tenant records, in no particular order.
    #[must_use]
    pub fn tenants(&self) -> Vec<Arc<TenantSettings>> {
        self.inner.read().tenants.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().tenants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().tenants.is_empty()
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn get_tenant_id_by_folder(&self, folder_name: &str) -> anyhow::Result<Option<TenantId>> {
        Ok(self
            .inner
            .read()
            .by_folder
            .get(&folder_key(folder_name))
            .copied())
    }

    async fn get_tenant_by_host(&self, host: &str) -> anyhow::Result<Option<Arc<TenantSettings>>> {
        let index = self.inner.read();
        Ok(index
            .by_host
            .get(&host_key(host))
            .and_then(|id| index.tenants.get(id))
            .cloned())
    }

    async fn fetch_tenant_by_id(&self, id: TenantId) -> anyhow::Result<Option<Arc<TenantSettings>>> {
        Ok(self.inner.read().tenants.get(&id).cloned())
    }
}
