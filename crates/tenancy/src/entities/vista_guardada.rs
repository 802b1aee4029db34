//! Saved list views.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connector::Connector;
use crate::error::RegistryResult;
use crate::registry::{Model, ModelRegistry};
use crate::schema::{Entity, FieldDefinition, FieldType, IndexDefinition, SchemaDefinition};
use crate::tenant::{TenantDatabaseConfig, TenantId};

/// A user's saved filters and columns for one list screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VistaGuardada {
    /// Document id.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// View name shown in the picker.
    pub nombre: String,
    /// Id of the owning `Usuario`.
    pub usuario_id: String,
    /// Screen the view applies to, e.g. `"facturas"`.
    pub modulo: String,
    /// Opaque filter state.
    #[serde(default)]
    pub filtros: Value,
    /// Visible columns in order.
    #[serde(default)]
    pub columnas: Vec<String>,
    /// Whether the view opens by default.
    #[serde(default)]
    pub predeterminada: bool,
}

impl Entity for VistaGuardada {
    const NAME: &'static str = "VistaGuardada";

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new()
            .with_field(FieldDefinition::new("nombre", FieldType::string_max(100)).required())
            .with_field(FieldDefinition::new("usuarioId", FieldType::reference("Usuario")).required())
            .with_field(FieldDefinition::new("modulo", FieldType::string_max(50)).required())
            .with_field(FieldDefinition::new("filtros", FieldType::Mixed))
            .with_field(FieldDefinition::new("columnas", FieldType::array(FieldType::string())))
            .with_field(FieldDefinition::new("predeterminada", FieldType::Boolean))
            .with_index(IndexDefinition::ascending(["usuarioId", "modulo", "nombre"]).unique())
            .with_timestamps()
            .strict()
    }
}

/// Returns the tenant's `VistaGuardada` model.
pub async fn vista_guardada_model<C: Connector>(
    registry: &ModelRegistry<C>,
    tenant_id: &TenantId,
    config: &TenantDatabaseConfig,
) -> RegistryResult<Arc<Model<C>>> {
    registry.model_for::<VistaGuardada>(tenant_id, config).await
}
