//! Test infrastructure for the tenancy registries.
//!
//! Provides a scripted in-memory [`MockConnector`] that counts dials, binds
//! and closes, can be told to fail or to take a while to connect, plus small
//! fixtures shared by the integration suites.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use empresa_tenancy::cipher::CredentialCipher;
use empresa_tenancy::connector::Connector;
use empresa_tenancy::registry::{ConnectionRegistry, ModelRegistry, RegistryConfig};
use empresa_tenancy::schema::{FieldDefinition, FieldType, SchemaDefinition};
use empresa_tenancy::tenant::{ConnectionTarget, TenantDatabaseConfig};

// ============================================================================
// Mock connector
// ============================================================================

/// Error returned by a scripted dial failure.
#[derive(Debug, thiserror::Error)]
#[error("connection refused by {0}")]
pub struct MockDialError(String);

/// A fake live connection.
#[derive(Debug, Clone)]
pub struct MockConnection {
    /// Unique per successful dial.
    pub id: u64,
    /// The URI that was dialed.
    pub uri: String,
    closed: Arc<AtomicBool>,
}

impl MockConnection {
    /// Returns `true` once the connector closed this connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A fake entity binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockBinding {
    /// Bound entity name.
    pub entity: String,
    /// Id of the connection the entity was bound to.
    pub connection_id: u64,
}

#[derive(Debug, Default)]
struct MockState {
    dials: AtomicUsize,
    binds: AtomicUsize,
    closes: AtomicUsize,
    failures_left: AtomicUsize,
    panics_left: AtomicUsize,
    delay_ms: AtomicU64,
    next_id: AtomicU64,
    dialed: Mutex<Vec<String>>,
}

/// In-memory connector with scripted behaviour.
///
/// Clones share state, so a test can keep one clone for inspection after
/// moving another into a registry.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    /// Creates a connector that connects instantly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every dial take `delay` before completing.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }

    /// Makes the next `count` dials fail.
    pub fn fail_next(&self, count: usize) {
        self.state.failures_left.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` dials panic inside `connect`.
    pub fn panic_next(&self, count: usize) {
        self.state.panics_left.store(count, Ordering::SeqCst);
    }

    /// Number of dials attempted.
    pub fn dials(&self) -> usize {
        self.state.dials.load(Ordering::SeqCst)
    }

    /// Number of entity bindings created.
    pub fn binds(&self) -> usize {
        self.state.binds.load(Ordering::SeqCst)
    }

    /// Number of connections closed.
    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// URIs dialed so far, in order.
    pub fn dialed_uris(&self) -> Vec<String> {
        self.state.dialed.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Connection = MockConnection;
    type Binding = MockBinding;
    type Error = MockDialError;

    fn kind(&self) -> &'static str {
        "mock"
    }

    fn scheme(&self) -> &str {
        "mongodb"
    }

    async fn connect(&self, target: &ConnectionTarget) -> Result<MockConnection, MockDialError> {
        self.state.dials.fetch_add(1, Ordering::SeqCst);
        self.state.dialed.lock().push(target.uri().to_string());

        let delay = self.state.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let panicked = self
            .state
            .panics_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if panicked {
            panic!("driver crashed while dialing {}", target.redacted());
        }

        let failed = self
            .state
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(MockDialError(target.redacted().to_string()));
        }

        Ok(MockConnection {
            id: self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            uri: target.uri().to_string(),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn bind(
        &self,
        connection: &MockConnection,
        entity: &str,
        _schema: &SchemaDefinition,
    ) -> MockBinding {
        self.state.binds.fetch_add(1, Ordering::SeqCst);
        MockBinding {
            entity: entity.to_string(),
            connection_id: connection.id,
        }
    }

    async fn close(&self, connection: MockConnection) {
        connection.closed.store(true, Ordering::SeqCst);
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// The cipher used by every suite.
pub fn test_cipher() -> CredentialCipher {
    CredentialCipher::new([7u8; 32])
}

/// Tenant `acme` described by parts.
pub fn acme_config() -> TenantDatabaseConfig {
    TenantDatabaseConfig::parts("db1", 27017, "acme_db")
}

/// Tenant `globex` described by parts.
pub fn globex_config() -> TenantDatabaseConfig {
    TenantDatabaseConfig::parts("db2", 27017, "globex_db")
}

/// Builds a connection registry over `connector`.
pub fn connection_registry(
    connector: MockConnector,
    config: RegistryConfig,
) -> ConnectionRegistry<MockConnector> {
    ConnectionRegistry::new(connector, test_cipher(), config)
}

/// Builds a model registry over `connector`.
pub fn model_registry(connector: MockConnector, config: RegistryConfig) -> ModelRegistry<MockConnector> {
    ModelRegistry::new(connection_registry(connector, config))
}

/// A minimal customer schema.
pub fn cliente_schema() -> SchemaDefinition {
    SchemaDefinition::new()
        .with_field(FieldDefinition::new("nombre", FieldType::string()).required())
        .with_field(FieldDefinition::new("email", FieldType::string()))
}

/// A minimal product schema.
pub fn producto_schema() -> SchemaDefinition {
    SchemaDefinition::new()
        .with_field(FieldDefinition::new("nombre", FieldType::string()).required())
        .with_field(FieldDefinition::new("precio", FieldType::non_negative()).required())
}
