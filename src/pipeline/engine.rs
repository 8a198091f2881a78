use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, debug, debug_span, error, warn};
use uuid::Uuid;

use super::builder::{BodyProviderFn, DummyFn, ExtenderFn, MapChain};
use super::context::RequestContext;
use super::error::{ConfigurationError, HandlerError, StageError};
use super::fetcher::Fetcher;
use super::options::{FetchOptions, HeadersMap, HttpMethod, join_url};

/// Frozen configuration captured by [`Handler`]
pub(crate) struct Pipeline<Raw, Out> {
    pub(crate) path: String,
    pub(crate) method: HttpMethod,
    pub(crate) body_provider: BodyProviderFn,
    pub(crate) extenders: Vec<ExtenderFn>,
    pub(crate) fetcher: Arc<dyn Fetcher<Raw>>,
    pub(crate) dummy: Option<DummyFn<Raw>>,
    pub(crate) mappers: MapChain<Raw, Out>,
}

/// Request handler produced by `HandlerBuilder::build`
///
/// Cheap to clone; clones share the frozen pipeline. Concurrent calls are
/// independent of each other.
pub struct Handler<Raw, Out> {
    inner: Arc<Pipeline<Raw, Out>>,
}

impl<Raw, Out> Clone for Handler<Raw, Out> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<Raw, Out> fmt::Debug for Handler<Raw, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("path", &self.inner.path)
            .field("method", &self.inner.method)
            .field("extenders", &self.inner.extenders.len())
            .field("dummy", &self.inner.dummy.is_some())
            .field("mappers", &self.inner.mappers.len())
            .finish()
    }
}

impl<Raw, Out> Handler<Raw, Out>
where
    Raw: Send + 'static,
    Out: Send + 'static,
{
    pub(crate) fn new(pipeline: Pipeline<Raw, Out>) -> Self {
        Self {
            inner: Arc::new(pipeline),
        }
    }

    /// Path appended to the base URL
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn method(&self) -> HttpMethod {
        self.inner.method
    }

    /// Run the pipeline for one inbound request
    ///
    /// Any stage failure short-circuits the remaining stages and is
    /// normalized into a [`HandlerError`].
    pub async fn handle(&self, ctx: RequestContext) -> Result<Out, HandlerError> {
        let invocation_id = Uuid::new_v4();
        let span = debug_span!("handler", path = %self.inner.path, %invocation_id);

        self.run(ctx).instrument(span).await.map_err(|err| {
            let normalized = HandlerError::normalize(err);
            if normalized.is_configuration() {
                error!(path = %self.inner.path, %invocation_id, error = %normalized, "Handler misconfigured");
            } else {
                warn!(path = %self.inner.path, %invocation_id, error = %normalized, "Handler failed");
            }
            normalized
        })
    }

    async fn run(&self, ctx: RequestContext) -> Result<Out, StageError> {
        let pipeline = &self.inner;

        let base_url = ctx
            .runtime()
            .base_url
            .clone()
            .filter(|url| !url.is_empty())
            .ok_or(ConfigurationError::MissingBaseUrl)?;

        let body = (pipeline.body_provider)(ctx.clone()).await?;
        debug!(stage = "body", has_body = body.is_some(), "Body resolved");

        let method = pipeline.method.resolve(ctx.method());
        let dummy_mode = ctx.runtime().dummy_mode;

        let mut options = FetchOptions {
            url: join_url(&base_url, &pipeline.path),
            method,
            body,
            headers: HeadersMap::new(),
            timeout: None,
            context: ctx,
        };

        for extender in &pipeline.extenders {
            options = extender(options).await?;
        }
        debug!(
            stage = "extend",
            extenders = pipeline.extenders.len(),
            method = %options.method,
            url = %options.url,
            "Fetch options ready"
        );

        let raw = if dummy_mode {
            let dummy = pipeline.dummy.as_ref().ok_or_else(|| {
                ConfigurationError::DummyModeWithoutDummyFetcher {
                    path: pipeline.path.clone(),
                }
            })?;
            debug!(stage = "fetch", dummy = true, "Serving dummy response");
            dummy(&options)
        } else {
            debug!(stage = "fetch", dummy = false, "Fetching");
            pipeline.fetcher.fetch(options).await?
        };

        let out = pipeline.mappers.apply(raw).await?;
        debug!(stage = "map", mappers = pipeline.mappers.len(), "Response mapped");

        Ok(out)
    }
}
