//! Configuration for the komponent and the process engine it creates.

use crate::errors::KomponentError;
use crate::interceptors::SCOPE_INTERCEPTOR_PRIORITY;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the engine connection name.
pub const ENV_CONNECTION: &str = "BPMN_KOMPONENT_CONNECTION";
/// Environment variable overriding the transactional flag.
pub const ENV_TRANSACTIONAL: &str = "BPMN_KOMPONENT_TRANSACTIONAL";
/// Environment variable overriding the log filter.
pub const ENV_LOG: &str = "BPMN_KOMPONENT_LOG";
/// Environment variable switching JSON log output on or off.
pub const ENV_LOG_JSON: &str = "BPMN_KOMPONENT_LOG_JSON";

/// Top-level komponent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KomponentConfig {
    /// Process engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Priority of the scope interceptor in the engine's interceptor chain.
    #[serde(default = "default_scope_priority")]
    pub scope_interceptor_priority: i32,
}

fn default_scope_priority() -> i32 {
    SCOPE_INTERCEPTOR_PRIORITY
}

impl Default for KomponentConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
            scope_interceptor_priority: default_scope_priority(),
        }
    }
}

impl KomponentConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, KomponentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the engine configuration.
    #[must_use]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Sets the scope interceptor priority.
    #[must_use]
    pub fn with_scope_interceptor_priority(mut self, priority: i32) -> Self {
        self.scope_interceptor_priority = priority;
        self
    }

    /// Applies `BPMN_KOMPONENT_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, KomponentError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies `BPMN_KOMPONENT_*` overrides from an arbitrary lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, KomponentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(connection) = lookup(ENV_CONNECTION) {
            self.engine.connection = connection;
        }
        if let Some(value) = lookup(ENV_TRANSACTIONAL) {
            self.engine.transactional = parse_flag(ENV_TRANSACTIONAL, &value)?;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.logging.filter = filter;
        }
        if let Some(value) = lookup(ENV_LOG_JSON) {
            self.logging.json = parse_flag(ENV_LOG_JSON, &value)?;
        }
        Ok(self)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, KomponentError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(KomponentError::Config(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

/// Configuration of the process engine created by the komponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name of the database connection the engine uses.
    #[serde(default = "default_connection")]
    pub connection: String,
    /// Whether the engine wraps commands in transactions.
    #[serde(default = "default_transactional")]
    pub transactional: bool,
}

fn default_connection() -> String {
    "default".to_string()
}

fn default_transactional() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connection: default_connection(),
            transactional: default_transactional(),
        }
    }
}

impl EngineConfig {
    /// Sets the connection name.
    #[must_use]
    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    /// Sets the transactional flag.
    #[must_use]
    pub fn with_transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` env-filter directive.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info,bpmn_komponent=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}
