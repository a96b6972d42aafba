//! Configuration kinds and the tenant-scoped cache key derived from them.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::TenantContext;

/// Names a family of configuration (usually one external identity provider).
///
/// Kinds are lowercase: names built from strings (including deserialized
/// ones) are lowercased, so `"Facebook"` and [`ConfigurationKind::FACEBOOK`]
/// are the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ConfigurationKind(Cow<'static, str>);

impl ConfigurationKind {
    pub const FACEBOOK: Self = Self::from_static("facebook");
    pub const GOOGLE: Self = Self::from_static("google");
    pub const MICROSOFT: Self = Self::from_static("microsoft");
    pub const TWITTER: Self = Self::from_static("twitter");

    /// `name` must already be lowercase.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConfigurationKind {
    fn from(name: String) -> Self {
        if name.chars().any(char::is_uppercase) {
            Self(Cow::Owned(name.to_lowercase()))
        } else {
            Self(Cow::Owned(name))
        }
    }
}

impl From<&str> for ConfigurationKind {
    fn from(name: &str) -> Self {
        Self(Cow::Owned(name.to_lowercase()))
    }
}

impl From<ConfigurationKind> for String {
    fn from(kind: ConfigurationKind) -> Self {
        kind.0.into_owned()
    }
}

impl fmt::Display for ConfigurationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of one tenant-scoped configuration entry.
///
/// `name` is the kind alone in related-sites mode (one shared entry), and
/// `"{kind}-{folder}"` otherwise. Folder names are unique per store, so two
/// tenants never share a key outside related-sites mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedCacheKey {
    pub kind: ConfigurationKind,
    pub name: String,
}

impl ResolvedCacheKey {
    /// Derives the key for `kind` as seen by `tenant`.
    ///
    /// With no tenant the key falls back to the bare kind, which is also the
    /// shared related-sites key.
    #[must_use]
    pub fn for_tenant(kind: &ConfigurationKind, tenant: Option<&TenantContext>) -> Self {
        let name = match tenant {
            Some(t) if !t.use_related_sites_mode() => format!("{kind}-{}", t.folder_name()),
            _ => kind.to_string(),
        };
        Self {
            kind: kind.clone(),
            name,
        }
    }
}

impl fmt::Display for ResolvedCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
