//! Per-tenant, per-generation model registry.
//!
//! Models are cached under `(tenant, connection generation, entity name)`.
//! Including the generation means a tenant whose connection was evicted and
//! re-dialed gets freshly bound models instead of handles tied to a closed
//! connection. Within one generation a name is bound exactly once; asking for
//! it again with the same schema returns the same `Arc`, asking with a
//! different schema is a [`SchemaConflictError`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::connector::Connector;
use crate::error::{ConnectionError, RegistryResult, SchemaConflictError, ValidationError};
use crate::schema::{Entity, SchemaDefinition};
use crate::tenant::{TenantDatabaseConfig, TenantId};

use super::connections::{ConnectionEntry, ConnectionLease, ConnectionRegistry};

type ModelKey = (TenantId, u64, String);

/// A schema bound to one tenant connection generation.
///
/// Immutable once created and safe to share across tasks.
pub struct Model<C: Connector> {
    tenant_id: TenantId,
    name: String,
    schema: SchemaDefinition,
    binding: C::Binding,
    connection: Arc<ConnectionEntry<C>>,
}

impl<C: Connector> Model<C> {
    /// Returns the owning tenant.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the connection generation this model is bound to.
    pub fn generation(&self) -> u64 {
        self.connection.generation()
    }

    /// Returns the entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the schema.
    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    /// Returns the driver binding, e.g. a collection handle.
    pub fn binding(&self) -> &C::Binding {
        &self.binding
    }

    /// Returns `true` once the underlying connection has been closed.
    pub fn is_retired(&self) -> bool {
        self.connection.is_retired()
    }

    /// Takes a lease on the connection this model is bound to.
    ///
    /// Hold the lease for the duration of a query so the connection is not
    /// evicted underneath it. Fails with [`ConnectionError::Retired`] once the
    /// generation has been evicted; fetch the model again to get a fresh one.
    pub fn lease(&self) -> Result<ConnectionLease<C>, ConnectionError> {
        ConnectionLease::acquire(Arc::clone(&self.connection))
    }

    /// Validates a JSON document against the schema.
    pub fn validate(&self, document: &Value) -> Result<(), ValidationError> {
        self.schema.validate(&self.name, document)
    }

    /// Serializes `value` and validates it against the schema.
    pub fn validate_entity<T: Serialize>(&self, value: &T) -> Result<(), ValidationError> {
        let document = serde_json::to_value(value).map_err(|e| ValidationError::Serialization {
            entity: self.name.clone(),
            message: e.to_string(),
        })?;
        self.validate(&document)
    }
}

impl<C: Connector> fmt::Debug for Model<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("tenant_id", &self.tenant_id)
            .field("generation", &self.generation())
            .field("name", &self.name)
            .finish()
    }
}

/// Registry of schema-bound models per tenant.
///
/// Cloning yields another handle to the same registry.
///
/// # Example
///
/// ```ignore
/// let models = ModelRegistry::new(connections);
/// let clientes = models.get_model(&tenant, &config, "Cliente", Cliente::schema()).await?;
/// let _lease = clientes.lease()?;
/// clientes.binding().find(doc! {}).await?;
/// ```
pub struct ModelRegistry<C: Connector> {
    connections: ConnectionRegistry<C>,
    models: Arc<RwLock<HashMap<ModelKey, Arc<Model<C>>>>>,
}

impl<C: Connector> Clone for ModelRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            connections: self.connections.clone(),
            models: Arc::clone(&self.models),
        }
    }
}

impl<C: Connector> fmt::Debug for ModelRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("connections", &self.connections)
            .field("models", &self.len())
            .finish()
    }
}

impl<C: Connector> ModelRegistry<C> {
    /// Creates a model registry on top of a connection registry.
    pub fn new(connections: ConnectionRegistry<C>) -> Self {
        Self {
            connections,
            models: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the underlying connection registry.
    pub fn connections(&self) -> &ConnectionRegistry<C> {
        &self.connections
    }

    /// Returns the model for `entity` on the tenant's current connection.
    ///
    /// Resolves (and if needed dials) the tenant connection first, then binds
    /// the schema once per generation. Repeated calls with an equal schema
    /// return the same `Arc`.
    ///
    /// # Errors
    ///
    /// Configuration and connection errors from the connection registry, and
    /// [`SchemaConflictError`] when `entity` is already bound in this
    /// generation with a different schema.
    pub async fn get_model(
        &self,
        tenant_id: &TenantId,
        config: &TenantDatabaseConfig,
        entity: &str,
        schema: SchemaDefinition,
    ) -> RegistryResult<Arc<Model<C>>> {
        let lease = self.connections.get_connection(tenant_id, config).await?;
        let generation = lease.generation();
        let key = (tenant_id.clone(), generation, entity.to_string());

        if let Some(existing) = self.models.read().get(&key) {
            return reuse(existing, &schema);
        }

        let mut models = self.models.write();
        if let Some(existing) = models.get(&key) {
            return reuse(existing, &schema);
        }

        let before = models.len();
        models.retain(|(tenant, g, _), m| {
            !m.is_retired() && (tenant != tenant_id || *g >= generation)
        });
        if models.len() < before {
            debug!(
                tenant_id = %tenant_id,
                generation,
                pruned = before - models.len(),
                "dropped models bound to retired connections"
            );
        }

        let binding = self
            .connections
            .connector()
            .bind(lease.handle(), entity, &schema);
        let model = Arc::new(Model {
            tenant_id: tenant_id.clone(),
            name: entity.to_string(),
            schema,
            binding,
            connection: Arc::clone(lease.entry()),
        });
        models.insert(key, Arc::clone(&model));

        debug!(tenant_id = %tenant_id, generation, entity, "registered model");
        Ok(model)
    }

    /// Returns the model for entity type `E`.
    pub async fn model_for<E: Entity>(
        &self,
        tenant_id: &TenantId,
        config: &TenantDatabaseConfig,
    ) -> RegistryResult<Arc<Model<C>>> {
        self.get_model(tenant_id, config, E::NAME, E::schema()).await
    }

    /// Drops every model whose connection has been retired and returns how
    /// many were removed.
    pub fn prune_retired(&self) -> usize {
        let mut models = self.models.write();
        let before = models.len();
        models.retain(|_, m| !m.is_retired());
        let pruned = before - models.len();
        if pruned > 0 {
            debug!(pruned, "dropped models bound to retired connections");
        }
        pruned
    }

    /// Returns the number of cached models.
    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    /// Returns `true` if no model is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every connection and drops every model.
    pub async fn shutdown_all(&self) {
        self.connections.shutdown().await;
        self.models.write().clear();
    }
}

fn reuse<C: Connector>(existing: &Arc<Model<C>>, schema: &SchemaDefinition) -> RegistryResult<Arc<Model<C>>> {
    if existing.schema == *schema {
        return Ok(Arc::clone(existing));
    }

    warn!(
        tenant_id = %existing.tenant_id,
        generation = existing.generation(),
        entity = %existing.name,
        "conflicting schema registration"
    );
    Err(SchemaConflictError {
        tenant_id: existing.tenant_id.clone(),
        entity: existing.name.clone(),
        generation: existing.generation(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::cipher::CredentialCipher;
    use crate::error::RegistryError;
    use crate::registry::RegistryConfig;
    use crate::schema::{FieldDefinition, FieldType};
    use crate::tenant::ConnectionTarget;

    #[derive(Debug, thiserror::Error)]
    #[error("never")]
    struct Never;

    #[derive(Debug)]
    struct EchoConnector;

    #[async_trait]
    impl Connector for EchoConnector {
        type Connection = String;
        type Binding = String;
        type Error = Never;

        fn kind(&self) -> &'static str {
            "echo"
        }

        fn scheme(&self) -> &str {
            "echo"
        }

        async fn connect(&self, target: &ConnectionTarget) -> Result<String, Never> {
            Ok(target.uri().to_string())
        }

        fn bind(&self, connection: &String, entity: &str, _: &SchemaDefinition) -> String {
            format!("{}#{}", connection, entity)
        }

        async fn close(&self, _: String) {}
    }

    fn registry() -> ModelRegistry<EchoConnector> {
        ModelRegistry::new(ConnectionRegistry::new(
            EchoConnector,
            CredentialCipher::new([9u8; 32]),
            RegistryConfig::default(),
        ))
    }

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new().with_field(FieldDefinition::new("nombre", FieldType::string()).required())
    }

    #[tokio::test]
    async fn test_binding_and_accessors() {
        let registry = registry();
        let tenant = TenantId::new("acme");
        let config = TenantDatabaseConfig::parts("db1", 27017, "acme_db");

        let model = registry.get_model(&tenant, &config, "Cliente", schema()).await.unwrap();
        assert_eq!(model.binding(), "echo://db1:27017/acme_db#Cliente");
        assert_eq!(model.name(), "Cliente");
        assert_eq!(model.tenant_id(), &tenant);
        assert_eq!(model.generation(), 1);
        assert!(!model.is_retired());
    }

    #[tokio::test]
    async fn test_validation_through_model() {
        let registry = registry();
        let model = registry
            .get_model(
                &TenantId::new("acme"),
                &TenantDatabaseConfig::parts("db1", 27017, "acme_db"),
                "Cliente",
                schema(),
            )
            .await
            .unwrap();

        assert!(model.validate(&json!({"nombre": "Ana"})).is_ok());
        let err = model.validate(&json!({"nombre": 7})).unwrap_err();
        assert_eq!(err.details()[0].path, "nombre");
        assert!(model.validate_entity(&json!({"nombre": "Ana"})).is_ok());
    }

    #[tokio::test]
    async fn test_conflict_reports_generation() {
        let registry = registry();
        let tenant = TenantId::new("acme");
        let config = TenantDatabaseConfig::parts("db1", 27017, "acme_db");

        registry.get_model(&tenant, &config, "Cliente", schema()).await.unwrap();
        let err = registry
            .get_model(&tenant, &config, "Cliente", schema().strict())
            .await
            .unwrap_err();
        match err {
            RegistryError::SchemaConflict(conflict) => {
                assert_eq!(conflict.entity, "Cliente");
                assert_eq!(conflict.generation, 1);
            }
            other => panic!("expected schema conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lease_after_eviction_is_retired() {
        let registry = registry();
        let tenant = TenantId::new("acme");
        let config = TenantDatabaseConfig::parts("db1", 27017, "acme_db");

        let model = registry.get_model(&tenant, &config, "Cliente", schema()).await.unwrap();
        assert!(model.lease().is_ok());

        assert!(registry.connections().evict(&tenant).await);
        assert!(model.is_retired());
        assert!(matches!(model.lease(), Err(ConnectionError::Retired { .. })));
    }
}
