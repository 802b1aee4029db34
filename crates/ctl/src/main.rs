//! empresa-ctl
//!
//! Operator CLI for tenant database secrets and connections.

use clap::Parser;
use empresa_ctl::{Command, CtlConfig, commands, init_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CtlConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let cipher = config
        .cipher()
        .map_err(|e| anyhow::anyhow!("Invalid encryption key configuration: {}", e))?;

    match &config.command {
        Command::Encrypt { value } => println!("{}", commands::encrypt(&cipher, value)),
        Command::Decrypt { value } => println!("{}", commands::decrypt(&cipher, value, config.strict)?),
        Command::Check(args) => run_check(&config, cipher, args).await?,
    }

    Ok(())
}

/// Runs `check` against MongoDB.
#[cfg(feature = "mongodb")]
async fn run_check(
    config: &CtlConfig,
    cipher: empresa_tenancy::CredentialCipher,
    args: &empresa_ctl::CheckArgs,
) -> anyhow::Result<()> {
    use empresa_tenancy::MongoConnector;
    use empresa_tenancy::registry::{ConnectionRegistry, ModelRegistry};

    let registry_config = config.registry_config();
    let connector = MongoConnector::from_config(&registry_config);
    let models = ModelRegistry::new(ConnectionRegistry::new(connector, cipher, registry_config));

    let report = commands::check(&models, args)
        .await
        .map_err(|e| anyhow::anyhow!("Tenant check failed: {}", e))?;
    println!("{}", report);
    Ok(())
}

/// Fallback when the mongodb feature is not enabled.
#[cfg(not(feature = "mongodb"))]
async fn run_check(
    _config: &CtlConfig,
    _cipher: empresa_tenancy::CredentialCipher,
    _args: &empresa_ctl::CheckArgs,
) -> anyhow::Result<()> {
    anyhow::bail!(
        "The check command requires the 'mongodb' feature. \
         Build with: cargo build -p empresa-ctl --features mongodb"
    )
}
