//! Reusable fetch-option extenders
//!
//! Each function returns a closure suitable for
//! [`HandlerBuilder::extend_fetch_options`](super::HandlerBuilder::extend_fetch_options).

use futures::future::{Ready, ready};
use reqwest::Url;
use std::time::Duration;

use super::error::StageError;
use super::options::{FetchOptions, HeadersMap};

type Extended = Ready<Result<FetchOptions, StageError>>;

/// Set (or overwrite) a single header
pub fn set_header(
    name: impl Into<String>,
    value: impl Into<String>,
) -> impl Fn(FetchOptions) -> Extended + Send + Sync + 'static {
    let name = name.into();
    let value = value.into();
    move |options| ready(Ok(options.header(name.clone(), value.clone())))
}

/// Set every header in `headers`, overwriting existing values
pub fn set_headers(headers: HeadersMap) -> impl Fn(FetchOptions) -> Extended + Send + Sync + 'static {
    move |mut options| {
        options
            .headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        ready(Ok(options))
    }
}

/// Copy the named inbound request headers onto the upstream request
///
/// Headers missing from the inbound request (or not valid UTF-8) are skipped.
pub fn forward_headers(names: Vec<String>) -> impl Fn(FetchOptions) -> Extended + Send + Sync + 'static {
    move |mut options| {
        for name in &names {
            let value = options.context.header(name).map(str::to_owned);
            if let Some(value) = value {
                options.headers.insert(name.clone(), value);
            }
        }
        ready(Ok(options))
    }
}

/// Add an `Authorization: Bearer <token>` header
pub fn bearer_token(token: impl Into<String>) -> impl Fn(FetchOptions) -> Extended + Send + Sync + 'static {
    set_header("Authorization", format!("Bearer {}", token.into()))
}

/// Per-request timeout consumed by the fetcher
pub fn timeout(duration: Duration) -> impl Fn(FetchOptions) -> Extended + Send + Sync + 'static {
    move |options| ready(Ok(options.timeout(duration)))
}

/// Append a query parameter to the upstream URL
pub fn query_param(
    name: impl Into<String>,
    value: impl Into<String>,
) -> impl Fn(FetchOptions) -> Extended + Send + Sync + 'static {
    let name = name.into();
    let value = value.into();
    move |mut options| {
        let result = Url::parse(&options.url)
            .map_err(|e| StageError::msg(format!("invalid upstream URL '{}': {e}", options.url)))
            .map(|mut url| {
                url.query_pairs_mut().append_pair(&name, &value);
                options.url = url.into();
                options
            });
        ready(result)
    }
}

/// Fill `{name}` and `{*name}` placeholders in the upstream URL with the
/// inbound route parameters, percent-encoded per path segment
pub fn path_params() -> impl Fn(FetchOptions) -> Extended + Send + Sync + 'static {
    |mut options| {
        for (name, value) in options.context.path_params() {
            let encoded = encode_path(value);
            options.url = options
                .url
                .replace(&format!("{{{name}}}"), &encoded)
                .replace(&format!("{{*{name}}}"), &encoded);
        }
        ready(Ok(options))
    }
}

fn encode_path(value: &str) -> String {
    value
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Append the inbound query string to the upstream URL
pub fn forward_query() -> impl Fn(FetchOptions) -> Extended + Send + Sync + 'static {
    |mut options| {
        if let Some(query) = options.context.uri().query().filter(|q| !q.is_empty()) {
            let separator = if options.url.contains('?') { '&' } else { '?' };
            options.url = format!("{}{separator}{query}", options.url);
        }
        ready(Ok(options))
    }
}
