//! Tenant model shared by the resolver and the options cache.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::key::ConfigurationKind;

/// Primary key of a tenant record in the tenant store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub Uuid);

impl TenantId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Multi-tenant options
// ---------------------------------------------------------------------------

/// How an inbound request is attributed to a tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Tenant is the first path segment (`/site1/...`); the root path is the
    /// `root` tenant.
    #[default]
    FolderName,
    /// Tenant is the request host name.
    HostName,
}

impl ResolutionMode {
    /// Returns the snake_case name used in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FolderName => "folder_name",
            Self::HostName => "host_name",
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`ResolutionMode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resolution mode `{0}` (expected `folder_name` or `host_name`)")]
pub struct ParseModeError(pub String);

impl FromStr for ResolutionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "folder_name" | "foldername" | "folder" => Ok(Self::FolderName),
            "host_name" | "hostname" | "host" => Ok(Self::HostName),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Process-wide multi-tenancy settings, read once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiTenantOptions {
    /// Folder- or host-based resolution.
    pub mode: ResolutionMode,
    /// When set, all tenants share one configuration instance per kind.
    /// Does not affect resolution.
    #[serde(default)]
    pub use_related_sites_mode: bool,
}

// ---------------------------------------------------------------------------
// Tenant settings
// ---------------------------------------------------------------------------

/// Credentials a tenant registered with one external identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl ProviderCredentials {
    /// Blank credentials mean "no tenant override".
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty()
    }
}

/// A stored tenant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSettings {
    pub id: TenantId,
    #[serde(default)]
    pub name: String,
    /// Folder segment this tenant answers to in folder mode. Empty or `root`
    /// for the root tenant.
    #[serde(default)]
    pub folder_name: String,
    /// Host name this tenant answers to in host mode.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub providers: BTreeMap<ConfigurationKind, ProviderCredentials>,
}

impl TenantSettings {
    /// Creates a tenant with a fresh id and no provider credentials.
    #[must_use]
    pub fn new(name: impl Into<String>, folder_name: impl Into<String>) -> Self {
        Self {
            id: TenantId::new_v4(),
            name: name.into(),
            folder_name: folder_name.into(),
            host: None,
            providers: BTreeMap::new(),
        }
    }

    /// Sets the host name.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Registers credentials for a provider kind.
    #[must_use]
    pub fn with_provider(
        mut self,
        kind: ConfigurationKind,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.providers.insert(
            kind,
            ProviderCredentials {
                client_id: client_id.into(),
                client_secret: client_secret.into(),
            },
        );
        self
    }

    /// Returns the tenant's credentials for `kind`, if configured and non-blank.
    #[must_use]
    pub fn credentials_for(&self, kind: &ConfigurationKind) -> Option<&ProviderCredentials> {
        self.providers.get(kind).filter(|c| c.is_configured())
    }
}

// ---------------------------------------------------------------------------
// TenantContext
// ---------------------------------------------------------------------------

/// Snapshot of a resolved tenant, created fresh for every resolution.
///
/// Carries the stored settings together with the process-wide options that
/// were in force when it was resolved. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub settings: Arc<TenantSettings>,
    pub options: MultiTenantOptions,
}

impl TenantContext {
    #[must_use]
    pub fn new(settings: Arc<TenantSettings>, options: MultiTenantOptions) -> Self {
        Self { settings, options }
    }

    #[must_use]
    pub fn id(&self) -> TenantId {
        self.settings.id
    }

    #[must_use]
    pub fn folder_name(&self) -> &str {
        &self.settings.folder_name
    }

    #[must_use]
    pub fn use_related_sites_mode(&self) -> bool {
        self.options.use_related_sites_mode
    }

    /// True when tenant-relative routes (callback paths) must carry the
    /// tenant folder so they resolve back to this tenant.
    #[must_use]
    pub fn uses_folder_routing(&self) -> bool {
        self.options.mode == ResolutionMode::FolderName
            && !self.options.use_related_sites_mode
            && !self.settings.folder_name.trim().is_empty()
    }
}
