use crate::pipeline::{HeadersMap, HttpMethod, RuntimeSettings};
use axum::http::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub routes: BTreeMap<String, RouteConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Largest inbound body accepted by proxied routes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024 // 5 MB
}

/// Upstream service every route proxies to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    pub base_url: Option<String>,
    /// Serve configured dummy responses instead of calling the upstream
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub dummy_mode: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Bearer token (loaded from environment, not from config file)
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            dummy_mode: false,
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            token: None,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            base_url: self.base_url.clone(),
            dummy_mode: self.dummy_mode,
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    concat!("relaybox/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Declarative proxy route
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Inbound path served by relaybox (axum syntax, e.g. `/api/users/{id}`)
    pub path: String,
    /// Path appended to the upstream base URL; defaults to `path`
    pub target: Option<String>,
    #[serde(default)]
    pub method: HttpMethod,
    /// Forward the inbound JSON body upstream; defaults to true unless the
    /// upstream method is GET or HEAD
    pub forward_body: Option<bool>,
    /// Append the inbound query string to the upstream URL
    #[serde(default = "default_forward_query")]
    pub forward_query: bool,
    /// Inbound headers copied onto the upstream request
    #[serde(default)]
    pub forward_headers: Vec<String>,
    /// Static headers added to every upstream request
    #[serde(default)]
    pub headers: HeadersMap,
    /// Overrides `upstream.timeout_ms`
    pub timeout_ms: Option<u64>,
    /// Response served while dummy mode is active
    pub dummy: Option<Value>,
}

impl RouteConfig {
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.path)
    }

    /// Whether a request sent upstream with `method` carries the inbound body
    pub fn forwards_body(&self, method: &Method) -> bool {
        self.forward_body
            .unwrap_or_else(|| *method != Method::GET && *method != Method::HEAD)
    }

    pub fn timeout(&self, upstream: &UpstreamConfig) -> Duration {
        self.timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| upstream.timeout())
    }
}

fn default_forward_query() -> bool {
    true
}

/// Accepts a boolean or the strings `"true"`/`"1"`/`"false"`/`"0"`/`""`
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "invalid boolean flag '{other}'"
            ))),
        },
    }
}
