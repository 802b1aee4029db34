//! Work shifts.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::connector::Connector;
use crate::error::RegistryResult;
use crate::registry::{Model, ModelRegistry};
use crate::schema::{Entity, FieldDefinition, FieldType, IndexDefinition, SchemaDefinition};
use crate::tenant::{TenantDatabaseConfig, TenantId};

/// Shift lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoTurno {
    /// Drafted by a manager.
    #[default]
    Planificado,
    /// Published to the employee.
    Confirmado,
    /// Withdrawn.
    Cancelado,
}

/// A planned shift for one employee on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turno {
    /// Document id.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Id of the assigned `Empleado`.
    pub empleado_id: String,
    /// Working day.
    pub dia: NaiveDate,
    /// Start time, `HH:MM`.
    pub hora_inicio: String,
    /// End time, `HH:MM`. May be earlier than the start for overnight shifts.
    pub hora_fin: String,
    /// Unpaid break length in minutes.
    #[serde(default)]
    pub descanso_minutos: u32,
    /// Lifecycle state.
    #[serde(default)]
    pub estado: EstadoTurno,
    /// Manager notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notas: Option<String>,
}

impl Entity for Turno {
    const NAME: &'static str = "Turno";

    fn schema() -> SchemaDefinition {
        let hora = || FieldType::String {
            min_len: Some(5),
            max_len: Some(5),
        };

        SchemaDefinition::new()
            .with_field(FieldDefinition::new("empleadoId", FieldType::reference("Empleado")).required())
            .with_field(FieldDefinition::new("dia", FieldType::string_max(10)).required())
            .with_field(FieldDefinition::new("horaInicio", hora()).required())
            .with_field(FieldDefinition::new("horaFin", hora()).required())
            .with_field(FieldDefinition::new("descansoMinutos", FieldType::Integer))
            .with_field(FieldDefinition::new(
                "estado",
                FieldType::one_of(["planificado", "confirmado", "cancelado"]),
            ))
            .with_field(FieldDefinition::new("notas", FieldType::string_max(500)))
            .with_index(IndexDefinition::ascending(["empleadoId", "dia"]))
            .with_timestamps()
    }
}

/// Returns the tenant's `Turno` model.
pub async fn turno_model<C: Connector>(
    registry: &ModelRegistry<C>,
    tenant_id: &TenantId,
    config: &TenantDatabaseConfig,
) -> RegistryResult<Arc<Model<C>>> {
    registry.model_for::<Turno>(tenant_id, config).await
}
