//! `resolve-site` — resolves one request against a tenants file and prints
//! the tenant together with its external provider options.
//!
//! ```text
//! resolve-site --tenants tenants.json --path /site1/account/login --kind facebook
//! MULTISITE_MODE=host_name resolve-site --tenants tenants.json --host one.example.com
//! ```
//!
//! Exit status: 0 on success, 2 when no tenant matches (bootstrap), 1 on error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use multisite_core::{ConfigurationKind, ResolveError};
use multisite_server::telemetry::{init_tracing, LogFormat};
use multisite_server::{provider_options_cache, InMemoryTenantStore, MultiTenantArgs, TenantResolver};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "resolve-site", about = "Resolve a request to a tenant and show its provider options")]
struct Cli {
    /// JSON file holding an array of tenant records.
    #[arg(long, env = "MULTISITE_TENANTS")]
    tenants: PathBuf,

    /// Request path.
    #[arg(long, default_value = "/")]
    path: String,

    /// Request host.
    #[arg(long, default_value = "")]
    host: String,

    /// Provider kinds to build options for. Defaults to the tenant's configured providers.
    #[arg(long = "kind")]
    kinds: Vec<String>,

    /// Log as JSON.
    #[arg(long)]
    log_json: bool,

    #[command(flatten)]
    multi_tenant: MultiTenantArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    })?;

    let store = InMemoryTenantStore::from_json_file(&cli.tenants).await?;
    let resolver = TenantResolver::new(Arc::new(store), cli.multi_tenant.resolver_config());

    let ctx = match resolver.resolve(&cli.path, &cli.host).await {
        Ok(ctx) => ctx,
        Err(err @ ResolveError::NotResolved { .. }) => {
            println!(
                "{}",
                json!({ "resolved": false, "bootstrap": true, "error": err.to_string() })
            );
            return Ok(ExitCode::from(2));
        }
        Err(err) => return Err(err.into()),
    };

    let kinds: Vec<ConfigurationKind> = if cli.kinds.is_empty() {
        ctx.settings.providers.keys().cloned().collect()
    } else {
        cli.kinds.iter().map(|k| ConfigurationKind::from(k.as_str())).collect()
    };

    let cache = provider_options_cache();
    let mut providers = serde_json::Map::new();
    for kind in &kinds {
        let options = cache.get(kind, Some(&ctx))?;
        providers.insert(kind.to_string(), serde_json::to_value(&*options)?);
    }

    let report = json!({
        "resolved": true,
        "tenant": {
            "id": ctx.id(),
            "name": ctx.settings.name,
            "folder_name": ctx.folder_name(),
            "host": ctx.settings.host,
        },
        "options": ctx.options,
        "providers": providers,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(ExitCode::SUCCESS)
}
