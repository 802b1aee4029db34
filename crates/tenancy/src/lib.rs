//! Empresa tenant database layer
//!
//! Every tenant ("empresa") of the platform owns a separate database whose
//! location and credentials live, encrypted, in a control-plane record. This
//! crate turns a tenant id plus that record into a ready, schema-bound model
//! handle that is shared safely across concurrent requests and never mixes
//! data between tenants.
//!
//! # Features
//!
//! - **Credential cipher**: AES-256-CBC `ivHex:cipherHex` secrets with legacy plaintext pass-through
//! - **Connection registry**: one lazily dialed connection per tenant, single-flight, idle eviction
//! - **Model registry**: schema bindings cached per `(tenant, generation, entity)`
//! - **Schema definitions**: declarative entity shapes with validation and by-name references
//!
//! Available driver features:
//! - `mongodb` (default) - MongoDB connector
//!
//! # Architecture
//!
//! - [`cipher`] - Encryption of connection secrets at rest
//! - [`tenant`] - Tenant ids and database configuration
//! - [`schema`] - Schema definitions and the [`Entity`](schema::Entity) trait
//! - [`entities`] - Built-in business entities
//! - [`connector`] - Database driver abstraction
//! - [`registry`] - Connection and model registries
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```no_run
//! use empresa_tenancy::cipher::CredentialCipher;
//! use empresa_tenancy::connector::MongoConnector;
//! use empresa_tenancy::entities::cliente_model;
//! use empresa_tenancy::registry::{ConnectionRegistry, ModelRegistry, RegistryConfig};
//! use empresa_tenancy::tenant::{TenantDatabaseConfig, TenantId};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RegistryConfig::default();
//! let cipher = CredentialCipher::from_env()?;
//! let connections = ConnectionRegistry::new(MongoConnector::from_config(&config), cipher, config);
//! connections.start_sweeper();
//! let models = ModelRegistry::new(connections);
//!
//! let tenant = TenantId::new("acme");
//! let db = TenantDatabaseConfig::parts("db1", 27017, "acme_db");
//! let clientes = cliente_model(&models, &tenant, &db).await?;
//!
//! // Hold a lease while querying so the connection is not evicted.
//! let _lease = clientes.lease()?;
//! let _collection = clientes.binding();
//!
//! models.shutdown_all().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cipher;
pub mod connector;
pub mod entities;
pub mod error;
pub mod registry;
pub mod schema;
pub mod tenant;

// Re-export commonly used types at crate root
pub use cipher::CredentialCipher;
pub use connector::Connector;
pub use error::{
    ConfigError, ConnectionError, RegistryError, RegistryResult, SchemaConflictError,
    ValidationError,
};
pub use registry::{ConnectionRegistry, Model, ModelRegistry, RegistryConfig};
pub use schema::{Entity, SchemaDefinition};
pub use tenant::{TenantDatabaseConfig, TenantId};

#[cfg(feature = "mongodb")]
pub use connector::MongoConnector;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
