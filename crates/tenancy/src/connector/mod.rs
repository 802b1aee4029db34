//! Database driver abstraction.
//!
//! The registries never talk to a driver directly. A [`Connector`] knows how to
//! dial a resolved [`ConnectionTarget`], bind an entity's schema to a live
//! connection, and close it again. The registries own every connection a
//! connector hands out; callers only ever see leases and model handles.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::schema::SchemaDefinition;
use crate::tenant::ConnectionTarget;

#[cfg(feature = "mongodb")]
mod mongo;

#[cfg(feature = "mongodb")]
pub use mongo::{MongoConnection, MongoConnector};

/// A database driver that can open tenant connections.
///
/// `Connection` is a cheap, clonable handle to one live connection (or
/// driver-side pool) and is shared by every request for the tenant.
/// `Binding` is whatever the driver needs to query one entity, such as a
/// collection handle.
///
/// # Example
///
/// ```ignore
/// use empresa_tenancy::connector::{Connector, MongoConnector};
///
/// let connector = MongoConnector::new("empresa", Duration::from_secs(10));
/// let conn = connector.connect(&target).await?;
/// let clientes = connector.bind(&conn, "Cliente", &Cliente::schema());
/// ```
#[async_trait]
pub trait Connector: Send + Sync + Debug + 'static {
    /// Handle to a live connection.
    type Connection: Clone + Send + Sync + 'static;

    /// Entity-level handle produced by [`bind`](Connector::bind).
    type Binding: Send + Sync + 'static;

    /// Error returned when dialing fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short backend name used in logs and errors.
    fn kind(&self) -> &'static str;

    /// URI scheme used when building a URI from discrete parts.
    fn scheme(&self) -> &str;

    /// Opens a connection and verifies it is usable.
    async fn connect(&self, target: &ConnectionTarget) -> Result<Self::Connection, Self::Error>;

    /// Binds an entity to a connection.
    ///
    /// Called exactly once per entity per connection generation. Anything the
    /// driver needs to set up for the entity (indexes, validators) belongs here.
    fn bind(
        &self,
        connection: &Self::Connection,
        entity: &str,
        schema: &SchemaDefinition,
    ) -> Self::Binding;

    /// Closes a connection. Errors are logged, not returned.
    async fn close(&self, connection: Self::Connection);
}
