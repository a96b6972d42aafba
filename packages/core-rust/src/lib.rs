//! `multisite` core — request path parsing, tenant model, cache keys, and errors.

pub mod error;
pub mod key;
pub mod path;
pub mod types;

pub use error::{OptionsError, ResolveError, TenantLookup};
pub use key::{ConfigurationKind, ResolvedCacheKey};
pub use path::{first_folder_segment, ROOT_FOLDER_NAME};
pub use types::{
    MultiTenantOptions, ParseModeError, ProviderCredentials, ResolutionMode, TenantContext,
    TenantId, TenantSettings,
};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
