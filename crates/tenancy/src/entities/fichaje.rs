//! Time-clock records.
//!
//! A `Fichaje` is one clock event of an employee: clocking in or out, or the
//! start or end of a break. Events come from biometric terminals, the web app
//! or the mobile app.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::connector::Connector;
use crate::error::RegistryResult;
use crate::registry::{Model, ModelRegistry};
use crate::schema::{Entity, FieldDefinition, FieldType, IndexDefinition, SchemaDefinition};
use crate::tenant::{TenantDatabaseConfig, TenantId};

/// Kind of clock event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoFichaje {
    /// Clock in.
    Entrada,
    /// Clock out.
    Salida,
    /// Break starts.
    PausaInicio,
    /// Break ends.
    PausaFin,
}

impl TipoFichaje {
    const ALL: [&'static str; 4] = ["entrada", "salida", "pausa_inicio", "pausa_fin"];
}

/// Where a clock event was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrigenFichaje {
    /// Biometric or POS terminal.
    Terminal,
    /// Web application.
    Web,
    /// Mobile application.
    App,
}

impl OrigenFichaje {
    const ALL: [&'static str; 3] = ["terminal", "web", "app"];
}

/// A single clock event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fichaje {
    /// Document id.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Id of the `Empleado` who clocked.
    pub empleado_id: String,
    /// Event kind.
    pub tipo: TipoFichaje,
    /// When the event happened.
    pub fecha: DateTime<Utc>,
    /// Where the event was recorded.
    pub origen: OrigenFichaje,
    /// Id of the `Terminal` that recorded the event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_id: Option<String>,
    /// Free-form geolocation payload from the app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ubicacion: Option<serde_json::Value>,
}

impl Entity for Fichaje {
    const NAME: &'static str = "Fichaje";

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new()
            .with_field(FieldDefinition::new("empleadoId", FieldType::reference("Empleado")).required())
            .with_field(FieldDefinition::new("tipo", FieldType::one_of(TipoFichaje::ALL)).required())
            .with_field(FieldDefinition::new("fecha", FieldType::Date).required())
            .with_field(FieldDefinition::new("origen", FieldType::one_of(OrigenFichaje::ALL)).required())
            .with_field(FieldDefinition::new("terminalId", FieldType::reference("Terminal")))
            .with_field(FieldDefinition::new("ubicacion", FieldType::Object))
            .with_index(IndexDefinition::ascending(["empleadoId", "fecha"]))
            .with_timestamps()
    }
}

/// Returns the tenant's `Fichaje` model.
pub async fn fichaje_model<C: Connector>(
    registry: &ModelRegistry<C>,
    tenant_id: &TenantId,
    config: &TenantDatabaseConfig,
) -> RegistryResult<Arc<Model<C>>> {
    registry.model_for::<Fichaje>(tenant_id, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fichaje_document_is_valid() {
        let fichaje = Fichaje {
            id: None,
            empleado_id: "65f1a2b3c4d5e6f7a8b9c0d1".to_string(),
            tipo: TipoFichaje::PausaInicio,
            fecha: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            origen: OrigenFichaje::Terminal,
            terminal_id: Some("65f1a2b3c4d5e6f7a8b9c0d2".to_string()),
            ubicacion: None,
        };

        let doc = serde_json::to_value(&fichaje).unwrap();
        assert_eq!(doc["tipo"], "pausa_inicio");
        assert!(Fichaje::schema().validate(Fichaje::NAME, &doc).is_ok());
    }

    #[test]
    fn test_references_by_name_only() {
        let refs: Vec<_> = Fichaje::schema().references().map(str::to_string).collect();
        assert_eq!(refs, vec!["Empleado", "Terminal"]);
    }
}
