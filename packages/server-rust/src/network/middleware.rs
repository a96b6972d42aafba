//! Tenant resolution middleware for axum.
//!
//! Attaches the resolved [`TenantContext`] to every request as an extension,
//! so handlers extract it with `Extension<TenantContext>`. Install with
//! `axum::middleware::from_fn_with_state(state, resolve_tenant)`.
//!
//! Failure handling:
//! - `NotResolved` (no tenant provisioned yet): requests under the setup path
//!   pass through without a tenant, everything else is redirected there
//! - `StoreUnavailable`: `503 Service Unavailable` with `Retry-After`

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use multisite_core::ResolveError;

use crate::config::TenantMiddlewareConfig;
use crate::resolver::TenantResolver;

/// Shared state for [`resolve_tenant`]. Cheap to clone.
#[derive(Clone)]
pub struct TenantState {
    pub resolver: Arc<TenantResolver>,
    pub config: Arc<TenantMiddlewareConfig>,
}

impl TenantState {
    #[must_use]
    pub fn new(resolver: Arc<TenantResolver>, config: TenantMiddlewareConfig) -> Self {
        Self {
            resolver,
            config: Arc::new(config),
        }
    }
}

/// Host the request was addressed to: the `Host` header, else the URI authority.
fn request_host(request: &Request) -> String {
    request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().authority().map(axum::http::uri::Authority::as_str))
        .unwrap_or_default()
        .to_string()
}

fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Resolves the request's tenant before running the rest of the stack.
pub async fn resolve_tenant(
    State(state): State<TenantState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let host = request_host(&request);

    match state.resolver.resolve(&path, &host).await {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(ResolveError::NotResolved { .. }) => {
            if is_under(&path, &state.config.setup_path) {
                next.run(request).await
            } else {
                Redirect::temporary(&state.config.setup_path).into_response()
            }
        }
        Err(ResolveError::StoreUnavailable(_)) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(state.config.retry_after.as_secs()),
            );
            response
        }
    }
}
