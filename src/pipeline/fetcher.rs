//! Fetch strategies: the real HTTP fetcher and the dummy (mock) fetcher

use async_trait::async_trait;
use axum::http::header;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::error::StageError;
use super::options::FetchOptions;

/// Strategy that turns final fetch options into a raw response
#[async_trait]
pub trait Fetcher<T>: Send + Sync {
    async fn fetch(&self, options: FetchOptions) -> Result<T, StageError>;
}

#[async_trait]
impl<T, F, Fut> Fetcher<T> for F
where
    T: Send + 'static,
    F: Fn(FetchOptions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, StageError>> + Send,
{
    async fn fetch(&self, options: FetchOptions) -> Result<T, StageError> {
        (self)(options).await
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("relaybox/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Default fetcher: sends the options as a JSON request and decodes a JSON response
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: HttpConfig) -> Result<Self, StageError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, options: &FetchOptions) -> Result<reqwest::Response, StageError> {
        let mut request = self.client.request(options.method.clone(), &options.url);

        for (name, value) in &options.headers {
            request = request.header(name, value);
        }

        if let Some(body) = &options.body {
            if options.get_header(header::CONTENT_TYPE.as_str()).is_none() {
                request = request.header(header::CONTENT_TYPE, "application/json");
            }
            request = request.body(serde_json::to_vec(body)?);
        }

        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = match options.context.abort_signal() {
            Some(signal) => tokio::select! {
                response = request.send() => response?,
                _ = signal.aborted() => {
                    debug!(url = %options.url, "Upstream request aborted");
                    return Err(StageError::aborted());
                }
            },
            None => request.send().await?,
        };

        Ok(response)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::with_client(Client::new())
    }
}

#[async_trait]
impl Fetcher<Value> for HttpFetcher {
    async fn fetch(&self, options: FetchOptions) -> Result<Value, StageError> {
        debug!(method = %options.method, url = %options.url, "Sending upstream request");

        let response = self.send(&options).await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = decode_body(&bytes);

        debug!(url = %options.url, status = status.as_u16(), size = bytes.len(), "Upstream responded");

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| {
                    format!(
                        "[{}] {}: {} {}",
                        options.method,
                        options.url,
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    )
                });

            return Err(StageError::status(status.as_u16(), message).with_data(body));
        }

        Ok(body)
    }
}

/// Empty bodies decode to `null`, non-JSON bodies to a string
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Mock response used instead of the real fetcher while dummy mode is active
#[derive(Clone)]
pub enum DummyFetcher<T> {
    /// Returned verbatim on every invocation
    Static(T),
    /// Invoked with the final fetch options
    Dynamic(Arc<dyn Fn(&FetchOptions) -> T + Send + Sync>),
}

impl<T> DummyFetcher<T> {
    pub fn data(data: T) -> Self {
        DummyFetcher::Static(data)
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&FetchOptions) -> T + Send + Sync + 'static,
    {
        DummyFetcher::Dynamic(Arc::new(f))
    }
}

impl<T: Clone> DummyFetcher<T> {
    pub fn respond(&self, options: &FetchOptions) -> T {
        match self {
            DummyFetcher::Static(data) => data.clone(),
            DummyFetcher::Dynamic(f) => f(options),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DummyFetcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DummyFetcher::Static(data) => f.debug_tuple("Static").field(data).finish(),
            DummyFetcher::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}
