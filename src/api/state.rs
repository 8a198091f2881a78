use std::sync::Arc;

use crate::config::Config;
use crate::observability::Metrics;
use crate::pipeline::RuntimeSettings;

#[derive(Debug, Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeSettings>,
    pub metrics: Arc<Metrics>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(runtime: RuntimeSettings, max_body_bytes: usize) -> Self {
        Self {
            runtime: Arc::new(runtime),
            metrics: Arc::new(Metrics::new()),
            max_body_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.upstream.runtime_settings(),
            config.server.max_body_bytes,
        )
    }
}
