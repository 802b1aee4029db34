//! Command line configuration.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use empresa_tenancy::cipher::{CredentialCipher, ENCRYPTION_KEY_ENV};
use empresa_tenancy::error::ConfigError;
use empresa_tenancy::registry::RegistryConfig;
use empresa_tenancy::tenant::{DecryptionPolicy, RawTenantConfig, TenantDatabaseConfig, TenantId};

/// Top-level CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "empresa-ctl")]
#[command(about = "Manage tenant database secrets and connections")]
#[command(version)]
pub struct CtlConfig {
    /// Encryption key (64 hex characters or 32 raw bytes).
    #[arg(long, env = "EMPRESA_ENCRYPTION_KEY", hide_env_values = true, global = true)]
    pub encryption_key: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "EMPRESA_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Close connections idle for this long (e.g. `30m`, `90s`).
    #[arg(long, env = "EMPRESA_IDLE_TTL", default_value = "30m", value_parser = humantime::parse_duration, global = true)]
    pub idle_ttl: Duration,

    /// Upper bound on a single connection attempt.
    #[arg(long, env = "EMPRESA_CONNECT_TIMEOUT", default_value = "10s", value_parser = humantime::parse_duration, global = true)]
    pub connect_timeout: Duration,

    /// Application name reported to the database server.
    #[arg(long, env = "EMPRESA_APP_NAME", default_value = "empresa-ctl", global = true)]
    pub app_name: String,

    /// Reject stored secrets that look encrypted but fail to decrypt.
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Operator commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Encrypt a secret into `ivHex:cipherHex` form.
    Encrypt {
        /// Plaintext to encrypt.
        value: String,
    },

    /// Decrypt an `ivHex:cipherHex` value.
    Decrypt {
        /// Stored value to decrypt.
        value: String,
    },

    /// Connect to a tenant database and register every built-in schema.
    Check(CheckArgs),
}

/// Arguments for `check`.
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Tenant id.
    #[arg(long)]
    pub tenant: String,

    /// Full connection URI, possibly encrypted.
    #[arg(long, conflicts_with_all = ["host", "port", "db_name", "user", "password"])]
    pub uri: Option<String>,

    /// Database host.
    #[arg(long)]
    pub host: Option<String>,

    /// Database port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Database name.
    #[arg(long)]
    pub db_name: Option<String>,

    /// User name.
    #[arg(long)]
    pub user: Option<String>,

    /// Password, possibly encrypted.
    #[arg(long)]
    pub password: Option<String>,
}

impl CheckArgs {
    /// Returns the tenant id.
    pub fn tenant_id(&self) -> TenantId {
        TenantId::new(self.tenant.trim())
    }

    /// Builds the tenant database config from the flags.
    pub fn database_config(&self) -> Result<TenantDatabaseConfig, ConfigError> {
        RawTenantConfig {
            uri: self.uri.clone(),
            host: self.host.clone(),
            port: self.port,
            db_name: self.db_name.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
        .try_into()
    }
}

impl CtlConfig {
    /// Builds the cipher from the configured key.
    pub fn cipher(&self) -> Result<CredentialCipher, ConfigError> {
        match &self.encryption_key {
            Some(material) => CredentialCipher::from_key_material(material),
            None => Err(ConfigError::InvalidKey {
                reason: format!("set {} or pass --encryption-key", ENCRYPTION_KEY_ENV),
            }),
        }
    }

    /// Builds the registry configuration.
    pub fn registry_config(&self) -> RegistryConfig {
        let policy = if self.strict {
            DecryptionPolicy::Strict
        } else {
            DecryptionPolicy::PassThrough
        };

        RegistryConfig::new()
            .with_idle_ttl(self.idle_ttl)
            .with_connect_timeout(self.connect_timeout)
            .with_app_name(self.app_name.clone())
            .with_decryption_policy(policy)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.idle_ttl.is_zero() {
            errors.push("Idle TTL cannot be 0".to_string());
        }

        if self.connect_timeout.is_zero() {
            errors.push("Connect timeout cannot be 0".to_string());
        }

        if let Command::Check(args) = &self.command {
            if args.tenant.trim().is_empty() {
                errors.push("Tenant id cannot be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
