//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested keys
//! use a double underscore, so `DATABASE_URL` sets `database_url`.

use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Directory of static pages served for unmatched paths.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Node events buffered per event-stream subscriber before the oldest
    /// are dropped.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Maximum size of the database connection pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_event_buffer() -> usize {
    256
}

fn default_max_connections() -> u32 {
    5
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source(
        source: impl config::Source + Send + Sync + 'static,
    ) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        config::Environment::default()
            .separator("__")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn defaults_apply_when_only_database_is_set() {
        let config =
            ServerConfig::from_source(env(&[("DATABASE_URL", "postgres://localhost/nodeflow")]))
                .expect("load");

        assert_eq!(config.database_url, "postgres://localhost/nodeflow");
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.event_buffer, 256);
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn numeric_values_are_parsed() {
        let config = ServerConfig::from_source(env(&[
            ("DATABASE_URL", "postgres://db/nodeflow"),
            ("EVENT_BUFFER", "32"),
            ("MAX_CONNECTIONS", "12"),
            ("BIND_ADDRESS", "127.0.0.1:8080"),
        ]))
        .expect("load");

        assert_eq!(config.event_buffer, 32);
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.bind_address, "127.0.0.1:8080");
    }

    #[test]
    fn database_url_is_required() {
        assert!(ServerConfig::from_source(env(&[])).is_err());
    }
}
