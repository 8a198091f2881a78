use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "RELAYBOX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/relaybox.toml";
const ENV_PREFIX: &str = "RELAYBOX";
const ENV_SEPARATOR: &str = "__";
const TOKEN_ENV_VAR: &str = "RELAYBOX_UPSTREAM_TOKEN";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;
    load_secrets_from(&mut config, |name| env::var(name).ok());

    Ok(config)
}

/// Secrets are never stored in TOML files, only in environment
fn load_secrets_from(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(token) = lookup(TOKEN_ENV_VAR).filter(|token| !token.is_empty()) {
        config.upstream.token = Some(token);
    }
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // RELAYBOX__UPSTREAM__BASE_URL -> upstream.base_url
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::HttpMethod;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_upstream_token_from_environment() {
        let mut config = Config::default();
        load_secrets_from(&mut config, |name| {
            (name == "RELAYBOX_UPSTREAM_TOKEN").then(|| "s3cret".to_string())
        });
        assert_eq!(config.upstream.token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_empty_or_missing_token_is_ignored() {
        let mut config = Config::default();
        load_secrets_from(&mut config, |_| Some(String::new()));
        assert!(config.upstream.token.is_none());

        load_secrets_from(&mut config, |_| None);
        assert!(config.upstream.token.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9000"
max_body_bytes = 1024

[upstream]
base_url = "http://backend:9000"
dummy_mode = "true"
timeout_ms = 1500
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.server.max_body_bytes, 1024);
        assert_eq!(config.upstream.base_url.as_deref(), Some("http://backend:9000"));
        assert!(config.upstream.dummy_mode);
        assert_eq!(config.upstream.timeout_ms, 1500);
        assert!(config.upstream.token.is_none());
    }

    #[test]
    fn test_routes_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[upstream]
base_url = "http://backend:9000"

[routes.list_users]
path = "/api/users"
target = "/users"
method = "get"
forward_headers = ["authorization"]
headers = { "x-source" = "relaybox" }

[routes.create_user]
path = "/api/users/new"
target = "/users"
method = "POST"
timeout_ms = 500
dummy = { id = 1, name = "dummy" }
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.routes.len(), 2);

        let list = &config.routes["list_users"];
        assert_eq!(list.method, HttpMethod::Get);
        assert_eq!(list.target(), "/users");
        assert_eq!(list.forward_headers, vec!["authorization"]);
        assert_eq!(list.headers["x-source"], "relaybox");

        let create = &config.routes["create_user"];
        assert_eq!(create.method, HttpMethod::Post);
        assert_eq!(create.timeout_ms, Some(500));
        assert_eq!(create.dummy, Some(json!({ "id": 1, "name": "dummy" })));
    }
}
