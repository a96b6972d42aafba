//! External identity provider options.
//!
//! [`ExternalProviderOptions`] is the configuration instance handed to
//! sign-in integrations. [`DefaultProviderFactory`] produces the placeholder
//! template for any provider kind, and [`ExternalProviderOptionsBuilder`]
//! swaps in the tenant's own application credentials.

use std::sync::Arc;

use multisite_core::{ConfigurationKind, OptionsError, TenantContext};
use serde::Serialize;
use tracing::error;

use super::builder::{TenantOptionsBuilder, TenantOverride};
use super::cache::TenantOptionsCache;
use crate::traits::ConfigurationFactory;

/// Credential value used until a tenant configures its own.
pub const PLACEHOLDER_CREDENTIAL: &str = "placeholder";

/// Authentication scheme external sign-ins complete into.
pub const EXTERNAL_SIGN_IN_SCHEME: &str = "Identity.External";

/// Options for one external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalProviderOptions {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// Scheme the provider signs into; unset until a tenant configures the provider.
    pub sign_in_scheme: Option<String>,
    /// Path the provider redirects back to, relative to the application root.
    pub callback_path: String,
    pub scopes: Vec<String>,
}

impl ExternalProviderOptions {
    #[must_use]
    pub fn has_placeholder_credentials(&self) -> bool {
        self.client_id == PLACEHOLDER_CREDENTIAL
    }
}

/// Template factory for [`ExternalProviderOptions`].
///
/// Accepts any kind; well-known kinds get their usual default scopes.
#[derive(Debug, Clone, Default)]
pub struct DefaultProviderFactory;

impl DefaultProviderFactory {
    fn default_scopes(kind: &ConfigurationKind) -> Vec<String> {
        let scopes: &[&str] = match kind.as_str() {
            "facebook" => &["email"],
            "google" | "microsoft" => &["openid", "profile", "email"],
            _ => &[],
        };
        scopes.iter().map(ToString::to_string).collect()
    }
}

impl ConfigurationFactory<ExternalProviderOptions> for DefaultProviderFactory {
    fn create_template(&self, kind: &ConfigurationKind) -> anyhow::Result<ExternalProviderOptions> {
        anyhow::ensure!(
            !kind.as_str().trim().is_empty() && !kind.as_str().contains('/'),
            "provider kind `{kind}` cannot form a callback path"
        );
        Ok(ExternalProviderOptions {
            client_id: PLACEHOLDER_CREDENTIAL.to_string(),
            client_secret: PLACEHOLDER_CREDENTIAL.to_string(),
            sign_in_scheme: None,
            callback_path: format!("/signin-{kind}"),
            scopes: Self::default_scopes(kind),
        })
    }
}

/// Applies a tenant's provider credentials onto the template.
#[derive(Debug, Clone, Default)]
pub struct ExternalProviderOptionsBuilder;

impl TenantOptionsBuilder<ExternalProviderOptions> for ExternalProviderOptionsBuilder {
    fn build(
        &self,
        kind: &ConfigurationKind,
        template: &ExternalProviderOptions,
        tenant: Option<&TenantContext>,
    ) -> Result<TenantOverride<ExternalProviderOptions>, OptionsError> {
        let Some(tenant) = tenant else {
            let err = OptionsError::MissingTenantContext { kind: kind.clone() };
            error!(error = %err, "using placeholder provider credentials");
            return Ok(TenantOverride::NoOverride);
        };
        let Some(credentials) = tenant.settings.credentials_for(kind) else {
            return Ok(TenantOverride::NoOverride);
        };
        if !template.callback_path.starts_with('/') {
            return Err(OptionsError::InvalidOptions {
                kind: kind.clone(),
                reason: format!(
                    "callback path `{}` must start with `/`",
                    template.callback_path
                ),
            });
        }

        let mut options = template.clone();
        options.client_id.clone_from(&credentials.client_id);
        options.client_secret.clone_from(&credentials.client_secret);
        options.sign_in_scheme = Some(EXTERNAL_SIGN_IN_SCHEME.to_string());
        if tenant.uses_folder_routing() {
            // Callbacks must come back through the tenant's folder to resolve it.
            options.callback_path = format!("/{}{}", tenant.folder_name(), template.callback_path);
        }
        Ok(TenantOverride::Applied(options))
    }
}

/// Options cache for external identity providers.
pub type ProviderOptionsCache = TenantOptionsCache<ExternalProviderOptions>;

/// Creates a provider options cache wired with the default factory and builder.
#[must_use]
pub fn provider_options_cache() -> ProviderOptionsCache {
    TenantOptionsCache::new(
        Arc::new(DefaultProviderFactory),
        Arc::new(ExternalProviderOptionsBuilder),
    )
}
