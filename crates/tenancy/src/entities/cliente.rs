//! Customers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::connector::Connector;
use crate::error::RegistryResult;
use crate::registry::{Model, ModelRegistry};
use crate::schema::{Entity, FieldDefinition, FieldType, SchemaDefinition};
use crate::tenant::{TenantDatabaseConfig, TenantId};

/// A customer of the tenant company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cliente {
    /// Document id.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Legal or trading name.
    pub nombre: String,
    /// Tax id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nif: Option<String>,
    /// Contact e-mail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    /// Postal address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
    /// Whether the customer is active.
    #[serde(default = "default_activo")]
    pub activo: bool,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_activo() -> bool {
    true
}

impl Cliente {
    /// Creates an active customer with only a name.
    pub fn new(nombre: impl Into<String>) -> Self {
        Self {
            id: None,
            nombre: nombre.into(),
            nif: None,
            email: None,
            telefono: None,
            direccion: None,
            activo: true,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Entity for Cliente {
    const NAME: &'static str = "Cliente";

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new()
            .with_field(
                FieldDefinition::new(
                    "nombre",
                    FieldType::String {
                        min_len: Some(1),
                        max_len: Some(200),
                    },
                )
                .required()
                .indexed(),
            )
            .with_field(FieldDefinition::new("nif", FieldType::string_max(20)).unique())
            .with_field(FieldDefinition::new("email", FieldType::string_max(254)))
            .with_field(FieldDefinition::new("telefono", FieldType::string_max(30)))
            .with_field(FieldDefinition::new("direccion", FieldType::string()))
            .with_field(
                FieldDefinition::new("activo", FieldType::Boolean)
                    .with_default(serde_json::Value::Bool(true)),
            )
            .with_timestamps()
    }
}

/// Returns the tenant's `Cliente` model.
pub async fn cliente_model<C: Connector>(
    registry: &ModelRegistry<C>,
    tenant_id: &TenantId,
    config: &TenantDatabaseConfig,
) -> RegistryResult<Arc<Model<C>>> {
    registry.model_for::<Cliente>(tenant_id, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cliente_is_valid() {
        let cliente = Cliente::new("Ana García");
        let doc = serde_json::to_value(&cliente).unwrap();
        assert!(Cliente::schema().validate(Cliente::NAME, &doc).is_ok());
    }

    #[test]
    fn test_activo_defaults_to_true() {
        let cliente: Cliente = serde_json::from_str(r#"{"nombre": "Ana"}"#).unwrap();
        assert!(cliente.activo);
    }

    #[test]
    fn test_nif_index_allows_missing_values() {
        let plan = Cliente::schema().index_plan();
        let nif = plan.iter().find(|i| i.keys[0].0 == "nif").unwrap();
        assert!(nif.unique);
        assert!(nif.sparse);
    }
}
