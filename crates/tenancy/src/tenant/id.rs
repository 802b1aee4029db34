//! Tenant identifier type.
//!
//! This module defines the [`TenantId`] type, the stable opaque key under which
//! every per-tenant cache slot is stored.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque tenant identifier.
///
/// The identifier is supplied by upstream tenant resolution (typically the
/// control-plane `Empresa` record id) and is never derived from the tenant's
/// connection settings. Two configs that describe the same database in
/// different ways (URI vs. discrete parts) therefore share one cache slot as
/// long as they are looked up under the same `TenantId`.
///
/// # Examples
///
/// ```
/// use empresa_tenancy::tenant::TenantId;
///
/// let tenant = TenantId::new("acme");
/// assert_eq!(tenant.as_str(), "acme");
/// assert_eq!(tenant.to_string(), "acme");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new tenant ID from the given string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0)
    }
}

impl FromStr for TenantId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TenantId::new(s))
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        TenantId::new(s)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        TenantId::new(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
