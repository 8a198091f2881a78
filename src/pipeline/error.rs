use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Message used when a failure carries no usable message of its own
pub const DEFAULT_ERROR_MESSAGE: &str = "Backend request failed";

const DEFAULT_STATUS_CODE: u16 = 500;
const DEFAULT_STATUS_MESSAGE: &str = "Internal Server Error";

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal misconfiguration detected while a handler runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no upstream base URL configured")]
    MissingBaseUrl,

    #[error("dummy mode is active but the handler for '{path}' has no dummy fetcher")]
    DummyModeWithoutDummyFetcher { path: String },
}

/// Failure raised by any pipeline stage (body provider, extender, fetcher, mapper)
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{0}")]
    Message(String),

    #[error("{message}")]
    Status {
        status_code: u16,
        status_message: Option<String>,
        message: String,
        data: Option<Value>,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Other(BoxError),
}

impl StageError {
    /// Plain failure message with no status attached
    pub fn msg(message: impl Into<String>) -> Self {
        StageError::Message(message.into())
    }

    /// Failure carrying an explicit HTTP status
    pub fn status(status_code: u16, message: impl Into<String>) -> Self {
        StageError::Status {
            status_code,
            status_message: None,
            message: message.into(),
            data: None,
        }
    }

    pub fn other(err: impl Into<BoxError>) -> Self {
        StageError::Other(err.into())
    }

    pub fn aborted() -> Self {
        StageError::status(499, "request aborted").with_status_message("Client Closed Request")
    }

    /// Attach a status message; no-op for variants that carry no status
    pub fn with_status_message(self, status_message: impl Into<String>) -> Self {
        match self {
            StageError::Status {
                status_code,
                message,
                data,
                ..
            } => StageError::Status {
                status_code,
                status_message: Some(status_message.into()),
                message,
                data,
            },
            other => other,
        }
    }

    /// Attach diagnostic data; no-op for variants that carry no status
    pub fn with_data(self, data: Value) -> Self {
        match self {
            StageError::Status {
                status_code,
                status_message,
                message,
                ..
            } => StageError::Status {
                status_code,
                status_message,
                message,
                data: Some(data),
            },
            other => other,
        }
    }

    /// Status code carried by the failure itself, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StageError::Status { status_code, .. } => Some(*status_code),
            StageError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    fn status_message(&self) -> Option<&str> {
        match self {
            StageError::Status { status_message, .. } => status_message.as_deref(),
            _ => None,
        }
    }

    /// JSON rendering of the failure as it was raised
    pub fn to_value(&self) -> Value {
        match self {
            StageError::Message(message) => Value::String(message.clone()),
            StageError::Status {
                status_code,
                status_message,
                message,
                data,
            } => {
                let mut object = Map::new();
                object.insert("statusCode".to_string(), Value::from(*status_code));
                if let Some(status_message) = status_message {
                    object.insert(
                        "statusMessage".to_string(),
                        Value::String(status_message.clone()),
                    );
                }
                object.insert("message".to_string(), Value::String(message.clone()));
                if let Some(data) = data {
                    object.insert("data".to_string(), data.clone());
                }
                Value::Object(object)
            }
            other => Value::String(other.to_string()),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, StageError::Configuration(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    pub original_error: Value,
}

/// Uniform error returned by every handler
///
/// Produced exactly once, at the outer boundary of a handler invocation,
/// from whatever [`StageError`] short-circuited the pipeline. The original
/// failure stays reachable through [`HandlerError::cause`] and
/// [`std::error::Error::source`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerError {
    pub status_code: u16,
    pub status_message: String,
    pub message: String,
    pub data: ErrorData,
    #[serde(skip)]
    cause: Arc<StageError>,
}

impl HandlerError {
    pub fn normalize(err: StageError) -> Self {
        // Codes outside the HTTP range cannot be sent as a response status
        let carried = err.status_code();
        let status_code = carried
            .filter(|code| (100..=599).contains(code))
            .unwrap_or(DEFAULT_STATUS_CODE);

        let status_message = err
            .status_message()
            .filter(|_| carried == Some(status_code))
            .map(str::to_owned)
            .unwrap_or_else(|| reason_phrase(status_code).to_string());

        let message = match err.to_string() {
            message if message.trim().is_empty() => DEFAULT_ERROR_MESSAGE.to_string(),
            message => message,
        };

        Self {
            status_code,
            status_message,
            message,
            data: ErrorData {
                original_error: err.to_value(),
            },
            cause: Arc::new(err),
        }
    }

    pub fn cause(&self) -> &StageError {
        &self.cause
    }

    pub fn is_configuration(&self) -> bool {
        self.cause.is_configuration()
    }
}

impl From<StageError> for HandlerError {
    fn from(err: StageError) -> Self {
        HandlerError::normalize(err)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.status_code, self.status_message, self.message
        )
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

fn reason_phrase(status_code: u16) -> &'static str {
    StatusCode::from_u16(status_code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or(DEFAULT_STATUS_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::error::Error as _;

    #[test]
    fn test_out_of_range_status_becomes_500() {
        for code in [0, 42, 600, 1000] {
            let err = HandlerError::normalize(StageError::status(code, "odd upstream"));

            assert_eq!(err.status_code, 500, "{code}");
            assert_eq!(err.status_message, "Internal Server Error");
            assert_eq!(err.message, "odd upstream");
            assert_eq!(err.data.original_error["statusCode"], code);
        }
    }

    #[test]
    fn test_plain_message_defaults_to_500() {
        let err = HandlerError::normalize(StageError::msg("boom"));

        assert_eq!(err.status_code, 500);
        assert_eq!(err.status_message, "Internal Server Error");
        assert_eq!(err.message, "boom");
        assert_eq!(err.data.original_error, json!("boom"));
    }

    #[test]
    fn test_status_error_is_preserved() {
        let err = HandlerError::normalize(StageError::status(404, "not found"));

        assert_eq!(err.status_code, 404);
        assert_eq!(err.status_message, "Not Found");
        assert_eq!(err.message, "not found");
        assert_eq!(
            err.data.original_error,
            json!({ "statusCode": 404, "message": "not found" })
        );
    }

    #[test]
    fn test_explicit_status_message_wins() {
        let err = HandlerError::normalize(
            StageError::status(422, "bad input")
                .with_status_message("Validation Failed")
                .with_data(json!({ "field": "name" })),
        );

        assert_eq!(err.status_message, "Validation Failed");
        assert_eq!(err.data.original_error["data"]["field"], "name");
    }

    #[test]
    fn test_empty_message_falls_back_to_default() {
        let err = HandlerError::normalize(StageError::msg("  "));

        assert_eq!(err.message, DEFAULT_ERROR_MESSAGE);
        assert_eq!(err.data.original_error, json!("  "));
    }

    #[test]
    fn test_configuration_error_is_flagged() {
        let err = HandlerError::normalize(ConfigurationError::MissingBaseUrl.into());

        assert!(err.is_configuration());
        assert_eq!(err.status_code, 500);
        assert_eq!(err.message, "no upstream base URL configured");
    }

    #[test]
    fn test_source_is_original_error() {
        let err = HandlerError::normalize(StageError::msg("boom"));
        let source = err.source().unwrap();

        assert_eq!(source.to_string(), "boom");
        assert!(matches!(err.cause(), StageError::Message(m) if m == "boom"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let err = HandlerError::normalize(StageError::status(404, "not found"));
        let value = serde_json::to_value(&err).unwrap();

        assert_eq!(value["statusCode"], 404);
        assert_eq!(value["statusMessage"], "Not Found");
        assert_eq!(value["message"], "not found");
        assert_eq!(value["data"]["originalError"]["statusCode"], 404);
    }
}
