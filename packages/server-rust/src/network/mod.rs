//! Request pipeline integration.

pub mod middleware;

pub use middleware::{resolve_tenant, TenantState};
