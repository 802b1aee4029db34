//! Connection and model registries.
//!
//! [`ConnectionRegistry`] owns one live connection per tenant;
//! [`ModelRegistry`] layers schema-bound models on top of it. Both are
//! explicitly constructed objects with a `shutdown` lifecycle, never globals,
//! so every test can build its own.

mod config;
mod connections;
mod models;

pub use config::RegistryConfig;
pub use connections::{
    ConnectionEntry, ConnectionLease, ConnectionRegistry, ConnectionState, RegistryStats,
};
pub use models::{Model, ModelRegistry};
