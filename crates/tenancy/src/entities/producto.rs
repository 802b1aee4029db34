//! Products and services sold by the tenant.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::connector::Connector;
use crate::error::RegistryResult;
use crate::registry::{Model, ModelRegistry};
use crate::schema::{Entity, FieldDefinition, FieldType, SchemaDefinition};
use crate::tenant::{TenantDatabaseConfig, TenantId};

/// A product or service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Producto {
    /// Document id.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    pub nombre: String,
    /// Stock keeping unit, unique per tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Unit price before tax.
    pub precio: f64,
    /// VAT percentage.
    #[serde(default)]
    pub iva: f64,
    /// Units in stock; `None` for services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    /// Id of the product's `Categoria`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categoria_id: Option<String>,
    /// Whether the product can be sold.
    #[serde(default)]
    pub activo: bool,
}

impl Entity for Producto {
    const NAME: &'static str = "Producto";

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new()
            .with_field(FieldDefinition::new("nombre", FieldType::string_max(200)).required())
            .with_field(FieldDefinition::new("sku", FieldType::string_max(64)).unique())
            .with_field(FieldDefinition::new("precio", FieldType::non_negative()).required())
            .with_field(FieldDefinition::new(
                "iva",
                FieldType::Number {
                    min: Some(0.0),
                    max: Some(100.0),
                },
            ))
            .with_field(FieldDefinition::new("stock", FieldType::Integer))
            .with_field(FieldDefinition::new("categoriaId", FieldType::reference("Categoria")).indexed())
            .with_field(FieldDefinition::new("activo", FieldType::Boolean))
            .with_timestamps()
    }
}

/// Returns the tenant's `Producto` model.
pub async fn producto_model<C: Connector>(
    registry: &ModelRegistry<C>,
    tenant_id: &TenantId,
    config: &TenantDatabaseConfig,
) -> RegistryResult<Arc<Model<C>>> {
    registry.model_for::<Producto>(tenant_id, config).await
}
