//! Command implementations.

use std::fmt;

use empresa_tenancy::cipher::CredentialCipher;
use empresa_tenancy::connector::Connector;
use empresa_tenancy::entities;
use empresa_tenancy::error::{DecryptionError, RegistryError};
use empresa_tenancy::registry::ModelRegistry;
use empresa_tenancy::tenant::TenantId;
use tracing::{info, warn};

use crate::config::CheckArgs;

/// Encrypts `value` for storage.
pub fn encrypt(cipher: &CredentialCipher, value: &str) -> String {
    cipher.encrypt(value)
}

/// Decrypts a stored value.
///
/// With `strict`, encrypted-looking values that fail to decrypt are an error;
/// otherwise they, like legacy plaintext, are returned unchanged.
pub fn decrypt(cipher: &CredentialCipher, value: &str, strict: bool) -> Result<String, DecryptionError> {
    if strict && CredentialCipher::is_encrypted(value) {
        cipher.try_decrypt(value)
    } else {
        Ok(cipher.decrypt(value))
    }
}

/// Outcome of a successful `check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Checked tenant.
    pub tenant_id: TenantId,
    /// Connector kind, e.g. `mongodb`.
    pub backend: &'static str,
    /// Connection generation the schemas were bound to.
    pub generation: u64,
    /// Registered entity names.
    pub entities: Vec<&'static str>,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "tenant {}: {} connection ready (generation {})",
            self.tenant_id, self.backend, self.generation
        )?;
        write!(f, "registered {} entities: {}", self.entities.len(), self.entities.join(", "))
    }
}

/// Connects to the tenant database, registers the whole entity catalog and
/// shuts the registry down again.
pub async fn check<C: Connector>(
    models: &ModelRegistry<C>,
    args: &CheckArgs,
) -> Result<CheckReport, RegistryError> {
    let result = register_catalog(models, args).await;
    models.shutdown_all().await;
    result
}

async fn register_catalog<C: Connector>(
    models: &ModelRegistry<C>,
    args: &CheckArgs,
) -> Result<CheckReport, RegistryError> {
    let tenant_id = args.tenant_id();
    let config = args.database_config()?;

    let mut registered = Vec::new();
    let mut generation = 0;
    for (name, schema) in entities::catalog() {
        match models.get_model(&tenant_id, &config, name, schema).await {
            Ok(model) => {
                generation = model.generation();
                registered.push(name);
            }
            Err(e) => {
                warn!(tenant_id = %tenant_id, entity = name, error = %e, "check failed");
                return Err(e);
            }
        }
    }

    info!(tenant_id = %tenant_id, generation, entities = registered.len(), "tenant check passed");

    Ok(CheckReport {
        tenant_id,
        backend: models.connections().connector().kind(),
        generation,
        entities: registered,
    })
}
