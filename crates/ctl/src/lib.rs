//! Operator tooling for the empresa tenant database layer.
//!
//! Encrypts and decrypts stored connection secrets and checks that a tenant's
//! database can be reached and that every built-in schema registers cleanly.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `EMPRESA_ENCRYPTION_KEY` | (required) | 64 hex chars or 32 raw bytes |
//! | `EMPRESA_LOG_LEVEL` | info | Log level |
//! | `EMPRESA_IDLE_TTL` | 30m | Idle connection TTL |
//! | `EMPRESA_CONNECT_TIMEOUT` | 10s | Connection attempt timeout |
//! | `EMPRESA_APP_NAME` | empresa-ctl | Application name reported to the server |

pub mod commands;
pub mod config;

pub use config::{CheckArgs, Command, CtlConfig};

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins over `level` when set. Call once at start-up.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("empresa_ctl={level},empresa_tenancy={level},mongodb=warn"))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
