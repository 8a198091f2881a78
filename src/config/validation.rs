use super::models::Config;
use std::collections::HashSet;
use thiserror::Error;

const RESERVED_PATHS: &[&str] = &["/health"];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No routes configured (at least one [routes.<name>] section is required)")]
    NoRoutesConfigured,

    #[error("Route '{route}' path '{path}' must start with '/'")]
    InvalidRoutePath { route: String, path: String },

    #[error("Route '{route}' target '{target}' must start with '/'")]
    InvalidRouteTarget { route: String, target: String },

    #[error("Route '{route}' reuses path '{path}' already served by another route")]
    DuplicateRoutePath { route: String, path: String },

    #[error("Route '{route}' path '{path}' is reserved")]
    ReservedRoutePath { route: String, path: String },

    #[error("Invalid upstream base URL scheme '{url}', expected 'http://' or 'https://'")]
    InvalidBaseUrl { url: String },

    #[error("Timeout must be positive: {field}")]
    InvalidTimeout { field: String },
}

/// Validate the entire configuration
///
/// A missing base URL or a missing dummy response is not rejected here;
/// both surface as configuration errors when a handler runs.
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_upstream(config)?;
    validate_routes(config)?;
    Ok(())
}

fn validate_upstream(config: &Config) -> Result<(), ValidationError> {
    if let Some(url) = &config.upstream.base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ValidationError::InvalidBaseUrl { url: url.clone() });
        }
    }

    if config.upstream.timeout_ms == 0 {
        return Err(ValidationError::InvalidTimeout {
            field: "upstream.timeout_ms".to_string(),
        });
    }

    Ok(())
}

fn validate_routes(config: &Config) -> Result<(), ValidationError> {
    if config.routes.is_empty() {
        return Err(ValidationError::NoRoutesConfigured);
    }

    let mut seen = HashSet::new();
    for (name, route) in &config.routes {
        if !route.path.starts_with('/') {
            return Err(ValidationError::InvalidRoutePath {
                route: name.clone(),
                path: route.path.clone(),
            });
        }

        if RESERVED_PATHS.contains(&route.path.as_str()) {
            return Err(ValidationError::ReservedRoutePath {
                route: name.clone(),
                path: route.path.clone(),
            });
        }

        if !route.target().starts_with('/') {
            return Err(ValidationError::InvalidRouteTarget {
                route: name.clone(),
                target: route.target().to_string(),
            });
        }

        if !seen.insert(route.path.as_str()) {
            return Err(ValidationError::DuplicateRoutePath {
                route: name.clone(),
                path: route.path.clone(),
            });
        }

        if route.timeout_ms == Some(0) {
            return Err(ValidationError::InvalidTimeout {
                field: format!("routes.{name}.timeout_ms"),
            });
        }
    }

    Ok(())
}
