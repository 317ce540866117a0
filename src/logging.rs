//! Logging setup.

use std::str::FromStr;

use tracing::Level;

use crate::config::LoggingConfig;
use crate::core::{Error, Result};

/// Installs a global `tracing` subscriber writing formatted events.
///
/// Returns `Ok(false)` if a subscriber was already installed, which is
/// common in test binaries.
pub fn init(config: &LoggingConfig) -> Result<bool> {
    let level = Level::from_str(&config.level)
        .map_err(|_| Error::Config(format!("unknown log level {:?}", config.level)))?;

    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(config.ansi)
        .with_target(false)
        .try_init()
        .is_ok();
    Ok(installed)
}
