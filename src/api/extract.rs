//! Inbound request extraction

use axum::extract::{FromRequestParts, RawPathParams, Request};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::collections::BTreeMap;

use super::state::AppState;
use crate::pipeline::{RequestContext, StageError};

/// Build a [`RequestContext`] from an axum request
///
/// Method, URI, headers and route parameters are kept as received.
/// The body is buffered up to `state.max_body_bytes`; larger bodies are
/// rejected with 413. Decompression has already happened in
/// `RequestDecompressionLayer`.
pub async fn request_context(request: Request, state: &AppState) -> Result<RequestContext, StageError> {
    let (mut parts, body) = request.into_parts();

    // Requests outside a parameterized route carry no params
    let path_params: BTreeMap<String, String> = RawPathParams::from_request_parts(&mut parts, state)
        .await
        .map(|params| {
            params
                .iter()
                .map(|(name, value)| (name.to_owned(), value.to_owned()))
                .collect()
        })
        .unwrap_or_default();

    let bytes = Limited::new(body, state.max_body_bytes)
        .collect()
        .await
        .map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                StageError::status(
                    413,
                    format!("payload exceeds {} bytes", state.max_body_bytes),
                )
            } else {
                StageError::status(400, format!("failed to read request body: {err}"))
            }
        })?
        .to_bytes();

    Ok(RequestContext::builder()
        .method(parts.method)
        .uri(parts.uri)
        .headers(parts.headers)
        .path_params(path_params)
        .body(bytes)
        .runtime(state.runtime.clone())
        .build())
}
