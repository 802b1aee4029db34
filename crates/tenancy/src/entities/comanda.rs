//! Kitchen tickets.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::connector::Connector;
use crate::error::RegistryResult;
use crate::registry::{Model, ModelRegistry};
use crate::schema::{Entity, FieldDefinition, FieldType, IndexDefinition, SchemaDefinition};
use crate::tenant::{TenantDatabaseConfig, TenantId};

/// Ticket progress through the kitchen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoComanda {
    /// Waiting for the kitchen.
    #[default]
    Pendiente,
    /// Being prepared.
    EnPreparacion,
    /// Ready to serve.
    Lista,
    /// Delivered to the table.
    Servida,
    /// Cancelled.
    Cancelada,
}

/// One line of a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineaComanda {
    /// Id of the ordered `Producto`.
    pub producto_id: String,
    /// Product name at the time of ordering.
    pub nombre: String,
    /// Quantity.
    pub cantidad: u32,
    /// Kitchen notes ("sin cebolla").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notas: Option<String>,
}

/// A kitchen ticket raised from a point-of-sale terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comanda {
    /// Document id.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Sequential ticket number.
    pub numero: u64,
    /// Table or counter label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesa: Option<String>,
    /// Ordered items.
    pub lineas: Vec<LineaComanda>,
    /// Progress.
    #[serde(default)]
    pub estado: EstadoComanda,
    /// Id of the `Terminal` that raised the ticket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_id: Option<String>,
    /// Ticket total.
    #[serde(default)]
    pub total: f64,
}

impl Entity for Comanda {
    const NAME: &'static str = "Comanda";

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new()
            .with_field(FieldDefinition::new("numero", FieldType::Integer).required())
            .with_field(FieldDefinition::new("mesa", FieldType::string_max(32)))
            .with_field(FieldDefinition::new("lineas", FieldType::array(FieldType::Object)).required())
            .with_field(
                FieldDefinition::new(
                    "estado",
                    FieldType::one_of(["pendiente", "en_preparacion", "lista", "servida", "cancelada"]),
                )
                .indexed(),
            )
            .with_field(FieldDefinition::new("terminalId", FieldType::reference("Terminal")))
            .with_field(FieldDefinition::new("total", FieldType::non_negative()))
            .with_index(IndexDefinition::ascending(["numero", "terminalId"]).unique())
            .with_timestamps()
    }
}

/// Returns the tenant's `Comanda` model.
pub async fn comanda_model<C: Connector>(
    registry: &ModelRegistry<C>,
    tenant_id: &TenantId,
    config: &TenantDatabaseConfig,
) -> RegistryResult<Arc<Model<C>>> {
    registry.model_for::<Comanda>(tenant_id, config).await
}
