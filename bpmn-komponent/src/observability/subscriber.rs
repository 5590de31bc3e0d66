//! `tracing-subscriber` setup driven by [`LoggingConfig`].

use crate::config::LoggingConfig;
use crate::errors::KomponentError;
use tracing_subscriber::EnvFilter;

/// Parses the configured filter directive.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, KomponentError> {
    EnvFilter::try_new(&config.filter)
        .map_err(|e| KomponentError::Config(format!("invalid log filter '{}': {e}", config.filter)))
}

/// Installs the global fmt subscriber.
///
/// Emits JSON lines when `config.json` is set, human-readable output
/// otherwise. Fails if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), KomponentError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed
        .map_err(|e| KomponentError::Config(format!("failed to install tracing subscriber: {e}")))
}
