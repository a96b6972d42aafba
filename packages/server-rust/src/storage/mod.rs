//! Tenant storage backends.
//!
//! The [`TenantStore`](crate::traits::TenantStore) trait is the seam; real
//! deployments plug in a database-backed store. [`InMemoryTenantStore`] is
//! the reference implementation used by tests and the `resolve-site` binary.

pub mod memory;

pub use memory::*;
