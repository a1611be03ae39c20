//! Logging setup for binaries built on the client.
//!
//! The library itself only emits `tracing` events; it never installs a
//! subscriber. Applications (and the bundled `rqlite` shell) call [`init`].

use crate::config::LoggingConfig;
use crate::error::{Result, RqliteError};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level`. Fails if a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| RqliteError::InvalidConfig {
            field: "log_level".to_string(),
            reason: e.to_string(),
        })?;

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| RqliteError::Internal(format!("Failed to init logging: {}", e)))?;
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| RqliteError::Internal(format!("Failed to init logging: {}", e)))?;
    }

    debug!("Logging initialized");
    Ok(())
}
