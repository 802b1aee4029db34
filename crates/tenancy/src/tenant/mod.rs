//! Tenant identity and database configuration.
//!
//! Every registry operation is keyed by a [`TenantId`] and receives the
//! tenant's [`TenantDatabaseConfig`] from upstream tenant resolution. This
//! crate trusts both inputs and performs no authentication itself.

mod config;
mod id;

pub use config::{ConnectionTarget, DecryptionPolicy, RawTenantConfig, TenantDatabaseConfig};
pub use id::TenantId;
