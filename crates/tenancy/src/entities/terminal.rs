//! Biometric and point-of-sale terminals.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::connector::Connector;
use crate::error::RegistryResult;
use crate::registry::{Model, ModelRegistry};
use crate::schema::{Entity, FieldDefinition, FieldType, SchemaDefinition};
use crate::tenant::{TenantDatabaseConfig, TenantId};

/// Kind of device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoTerminal {
    /// Fingerprint / face time clock.
    Biometrico,
    /// Point of sale.
    Tpv,
}

/// A registered device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Terminal {
    /// Document id.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    pub nombre: String,
    /// Kind of device.
    pub tipo: TipoTerminal,
    /// Manufacturer serial number.
    pub numero_serie: String,
    /// Last known IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Whether events from this device are accepted.
    #[serde(default)]
    pub activo: bool,
    /// Last time the device reported in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ultima_conexion: Option<DateTime<Utc>>,
}

impl Entity for Terminal {
    const NAME: &'static str = "Terminal";

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new()
            .with_field(FieldDefinition::new("nombre", FieldType::string_max(100)).required())
            .with_field(FieldDefinition::new("tipo", FieldType::one_of(["biometrico", "tpv"])).required())
            .with_field(FieldDefinition::new("numeroSerie", FieldType::string_max(64)).required().unique())
            .with_field(FieldDefinition::new("ip", FieldType::string_max(45)))
            .with_field(FieldDefinition::new("activo", FieldType::Boolean))
            .with_field(FieldDefinition::new("ultimaConexion", FieldType::Date))
            .with_timestamps()
    }
}

/// Returns the tenant's `Terminal` model.
pub async fn terminal_model<C: Connector>(
    registry: &ModelRegistry<C>,
    tenant_id: &TenantId,
    config: &TenantDatabaseConfig,
) -> RegistryResult<Arc<Model<C>>> {
    registry.model_for::<Terminal>(tenant_id, config).await
}
