//! Error types for the tenancy layer.
//!
//! Errors are grouped by the component that raises them: tenant configuration,
//! connection dialing, schema registration, document validation and the
//! (internal) credential cipher. [`RegistryError`] is the umbrella type returned
//! by the registries.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use crate::tenant::TenantId;

/// The primary error type for registry operations.
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    /// Tenant configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Connection errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Conflicting schema registration
    #[error(transparent)]
    SchemaConflict(#[from] SchemaConflictError),

    /// Document validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The registry has been shut down.
    #[error("registry has been shut down")]
    ShutDown,
}

impl RegistryError {
    /// Returns `true` if a caller may reasonably retry the operation.
    ///
    /// Only connection failures and timeouts qualify; configuration errors and
    /// schema conflicts are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistryError::Connection(ConnectionError::Failed { .. })
                | RegistryError::Connection(ConnectionError::Timeout { .. })
        )
    }

    /// Returns the HTTP status code an API boundary should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            RegistryError::Connection(_) => 503,
            RegistryError::Validation(_) => 422,
            RegistryError::Config(_) | RegistryError::SchemaConflict(_) | RegistryError::ShutDown => {
                500
            }
        }
    }

    /// Returns a message safe to expose to API clients.
    ///
    /// Connection and configuration messages may contain host names or driver
    /// output, so only a generic description is returned for them.
    pub fn public_message(&self) -> String {
        match self {
            RegistryError::Validation(e) => e.to_string(),
            RegistryError::Connection(_) => "tenant database is unavailable".to_string(),
            RegistryError::Config(_) => "tenant database is misconfigured".to_string(),
            RegistryError::SchemaConflict(_) | RegistryError::ShutDown => {
                "an internal error occurred".to_string()
            }
        }
    }
}

/// Errors in a tenant's database configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither a URI nor a complete host/port/dbName triple was supplied.
    #[error("tenant config has neither a uri nor host, port and dbName")]
    Incomplete,

    /// A field is present but unusable.
    #[error("invalid tenant config field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// An encrypted secret could not be decrypted (strict policy only).
    #[error("could not decrypt tenant secret '{field}': {source}")]
    Decryption {
        field: String,
        #[source]
        source: DecryptionError,
    },

    /// The process-wide encryption key is missing or malformed.
    #[error("invalid encryption key: {reason}")]
    InvalidKey { reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while obtaining a tenant connection.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Dialing the tenant database failed.
    #[error("connection to {backend} failed for tenant {tenant_id}: {message}")]
    Failed {
        tenant_id: TenantId,
        backend: String,
        message: String,
    },

    /// The caller stopped waiting for an in-flight dial.
    #[error("timed out after {timeout_ms}ms waiting for tenant {tenant_id} connection")]
    Timeout { tenant_id: TenantId, timeout_ms: u64 },

    /// The connection generation a handle was bound to has been evicted.
    #[error("connection generation {generation} for tenant {tenant_id} has been retired")]
    Retired { tenant_id: TenantId, generation: u64 },
}

/// The same entity name was registered with two different schemas.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "entity '{entity}' is already registered for tenant {tenant_id} (generation {generation}) with a different schema"
)]
pub struct SchemaConflictError {
    pub tenant_id: TenantId,
    pub entity: String,
    pub generation: u64,
}

/// A document does not satisfy its schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The document failed validation.
    #[error("invalid {entity} document: {}", summarize(.details))]
    InvalidDocument {
        entity: String,
        details: Vec<ValidationDetail>,
    },

    /// The value could not be serialized for validation.
    #[error("cannot serialize {entity} document: {message}")]
    Serialization { entity: String, message: String },
}

impl ValidationError {
    /// Returns the individual findings, if any.
    pub fn details(&self) -> &[ValidationDetail] {
        match self {
            ValidationError::InvalidDocument { details, .. } => details,
            ValidationError::Serialization { .. } => &[],
        }
    }
}

fn summarize(details: &[ValidationDetail]) -> String {
    details
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationDetail {
    /// Dotted path of the offending field.
    pub path: String,
    /// Human-readable message.
    pub message: String,
}

impl ValidationDetail {
    pub(crate) fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Failure to decrypt an `ivHex:cipherHex` value.
///
/// [`CredentialCipher::decrypt`](crate::cipher::CredentialCipher::decrypt)
/// swallows these and returns the input unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("value has no iv separator")]
    MissingSeparator,

    #[error("value is not valid hex")]
    InvalidHex,

    #[error("initialization vector must be 16 bytes, got {0}")]
    InvalidIv(usize),

    #[error("ciphertext rejected (wrong key or corrupted data)")]
    Cipher,

    #[error("decrypted value is not valid UTF-8")]
    Utf8,
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::Incomplete.to_string(),
            "tenant config has neither a uri nor host, port and dbName"
        );

        let err = ConfigError::invalid("port", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid tenant config field 'port': must be greater than zero"
        );
    }

    #[test]
    fn test_connection_error_is_retryable() {
        let err: RegistryError = ConnectionError::Failed {
            tenant_id: TenantId::new("acme"),
            backend: "mongodb".to_string(),
            message: "connection refused".to_string(),
        }
        .into();
        assert!(err.is_retryable());
        assert_eq!(err.http_status(), 503);

        let err: RegistryError = ConnectionError::Retired {
            tenant_id: TenantId::new("acme"),
            generation: 3,
        }
        .into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_schema_conflict_is_fatal() {
        let err: RegistryError = SchemaConflictError {
            tenant_id: TenantId::new("acme"),
            entity: "Cliente".to_string(),
            generation: 1,
        }
        .into();
        assert!(!err.is_retryable());
        assert_eq!(err.http_status(), 500);
        assert!(err.to_string().contains("Cliente"));
    }

    #[test]
    fn test_public_message_hides_connection_details() {
        let err: RegistryError = ConnectionError::Failed {
            tenant_id: TenantId::new("acme"),
            backend: "mongodb".to_string(),
            message: "auth failed for admin:hunter2@db1".to_string(),
        }
        .into();
        assert!(!err.public_message().contains("hunter2"));
        assert!(err.to_string().contains("acme"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::InvalidDocument {
            entity: "Cliente".to_string(),
            details: vec![
                ValidationDetail::new("nombre", "is required"),
                ValidationDetail::new("email", "expected string"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid Cliente document: nombre: is required; email: expected string"
        );
        assert_eq!(err.details().len(), 2);
    }
}
