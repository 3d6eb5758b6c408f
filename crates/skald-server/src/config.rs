//! Configuration file parsing for the server.
//!
//! Settings come from a TOML file (bind address, database path and an
//! `[engine]` table), then the environment variables `DAMPENING`,
//! `INFLUENCE`, `K`, `LF` and `STATEFUL` override the engine parameters.

use serde::Deserialize;
use skald_consolidator::{ConsolidationError, EngineConfig};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Environment variable that cannot be parsed
    #[error("Invalid value for environment variable {name}: '{value}'")]
    InvalidEnv {
        /// Variable name
        name: String,
        /// Offending value
        value: String,
    },

    /// Engine parameters out of range
    #[error(transparent)]
    Engine(#[from] ConsolidationError),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 8000)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// SQLite database file; `:memory:` keeps the ledger in memory
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Engine parameters
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8000
}

fn default_database_path() -> String {
    ":memory:".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            database_path: default_database_path(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`
    ///
    /// Variables that are unset or blank leave the value untouched.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let engine = &mut self.engine;
        if let Some(v) = read_var(&lookup, "DAMPENING")? {
            engine.dampening = v;
        }
        if let Some(v) = read_var(&lookup, "INFLUENCE")? {
            engine.influence = v;
        }
        if let Some(v) = read_var(&lookup, "K")? {
            engine.k = v;
        }
        if let Some(v) = read_var(&lookup, "LF")? {
            engine.laplace_factor = v;
        }
        if let Some(raw) = lookup("STATEFUL").filter(|v| !v.trim().is_empty()) {
            engine.stateful = parse_bool(&raw).ok_or(ConfigError::InvalidEnv {
                name: "STATEFUL".to_string(),
                value: raw,
            })?;
        }
        Ok(self)
    }

    /// Check the engine parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        Ok(())
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

fn read_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                name: name.to_string(),
                value: raw,
            }),
        _ => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
