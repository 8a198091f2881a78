//! Configuration management for relaybox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use relaybox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `RELAYBOX__<section>__<key>`
//!
//! Examples:
//! - `RELAYBOX__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `RELAYBOX__UPSTREAM__BASE_URL=http://backend:9000`
//! - `RELAYBOX__UPSTREAM__DUMMY_MODE=true`
//!
//! The upstream bearer token is only read from `RELAYBOX_UPSTREAM_TOKEN`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/relaybox.toml`.
//! This can be overridden using the `RELAYBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{Config, RouteConfig, ServerConfig, UpstreamConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails (bad paths, duplicate routes, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[routes.users]
path = "/users"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.routes.len(), 1);
        assert!(config.upstream.base_url.is_none());
    }

    #[test]
    fn test_validation_catches_duplicate_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[routes.a]
path = "/users"

[routes.b]
path = "/users"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::DuplicateRoutePath { .. })
        ));
    }

    #[test]
    fn test_malformed_file_is_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[routes.a]\npath = \"/a\"\nmethod = \"TRACE\"").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(result.unwrap_err(), ConfigError::LoadError(_)));
    }
}
