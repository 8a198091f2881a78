use axum::http::{HeaderMap, Method, Uri, header};
use bon::Builder;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

use super::error::StageError;

/// Process-wide settings a handler reads at call time
///
/// Configured once at startup and shared read-only by every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub base_url: Option<String>,
    pub dummy_mode: bool,
}

/// Receiving side of a cancellation signal carried by a request
#[derive(Debug, Clone)]
pub struct AbortSignal(watch::Receiver<bool>);

/// Sending side of a cancellation signal
#[derive(Debug)]
pub struct AbortHandle(watch::Sender<bool>);

pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle(tx), AbortSignal(rx))
}

impl AbortHandle {
    pub fn abort(&self) {
        // Receivers may already be gone
        let _ = self.0.send(true);
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the signal fires; never resolves if the handle is dropped first
    pub async fn aborted(&self) {
        let mut rx = self.0.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Inbound request as seen by the pipeline
#[derive(Debug, Clone, Builder)]
pub struct RequestContext {
    #[builder(default = Method::GET)]
    method: Method,
    #[builder(default)]
    uri: Uri,
    #[builder(default)]
    headers: HeaderMap,
    /// Parameters captured by the inbound route (`/users/{id}`)
    #[builder(default)]
    path_params: BTreeMap<String, String>,
    #[builder(default, into)]
    body: Bytes,
    abort: Option<AbortSignal>,
    #[builder(default, into)]
    runtime: Arc<RuntimeSettings>,
}

impl Default for RequestContext {
    fn default() -> Self {
        RequestContext::builder().build()
    }
}

impl RequestContext {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path_params(&self) -> &BTreeMap<String, String> {
        &self.path_params
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn abort_signal(&self) -> Option<&AbortSignal> {
        self.abort.as_ref()
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    /// Decode the inbound body as JSON
    ///
    /// A present Content-Type header must be `application/json`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, StageError> {
        if let Some(content_type) = self.header(header::CONTENT_TYPE.as_str()) {
            parse_content_type(content_type)?;
        }

        if self.body.is_empty() {
            return Err(StageError::status(400, "request body is empty"));
        }

        serde_json::from_slice(&self.body)
            .map_err(|e| StageError::status(400, format!("invalid JSON body: {e}")))
    }
}

/// Accepts `application/json` with optional parameters, rejects look-alikes
/// such as `application/jsonp` or `text/json`
fn parse_content_type(content_type: &str) -> Result<mime::Mime, StageError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        StageError::status(415, format!("invalid Content-Type: {content_type}"))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(StageError::status(
            415,
            format!(
                "Content-Type must be application/json, got: {}/{}",
                media_type.type_(),
                media_type.subtype()
            ),
        ));
    }

    Ok(media_type)
}
