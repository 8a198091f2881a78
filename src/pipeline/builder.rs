use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use super::context::RequestContext;
use super::engine::{Handler, Pipeline};
use super::error::StageError;
use super::fetcher::{DummyFetcher, Fetcher, HttpFetcher};
use super::options::{FetchOptions, HttpMethod};
use super::state::{AcceptsDummy, AcceptsFetcher, BodyLocked, FetcherLocked, Initial, Locked};

pub(crate) type BodyProviderFn =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Result<Option<Value>, StageError>> + Send + Sync>;

pub(crate) type ExtenderFn =
    Arc<dyn Fn(FetchOptions) -> BoxFuture<'static, Result<FetchOptions, StageError>> + Send + Sync>;

pub(crate) type DummyFn<T> = Arc<dyn Fn(&FetchOptions) -> T + Send + Sync>;

type MapFn<In, Out> = Arc<dyn Fn(In) -> BoxFuture<'static, Result<Out, StageError>> + Send + Sync>;

/// Response mappers folded left to right into a single step
pub(crate) struct MapChain<Raw, Out> {
    run: MapFn<Raw, Out>,
    len: usize,
}

impl<Raw> MapChain<Raw, Raw>
where
    Raw: Send + 'static,
{
    fn identity() -> Self {
        Self {
            run: Arc::new(|raw: Raw| future::ready(Ok(raw)).boxed()),
            len: 0,
        }
    }
}

impl<Raw, Out> MapChain<Raw, Out>
where
    Raw: Send + 'static,
    Out: Send + 'static,
{
    fn then<Next>(self, mapper: MapFn<Out, Next>) -> MapChain<Raw, Next>
    where
        Next: Send + 'static,
    {
        let prev = self.run;
        MapChain {
            run: Arc::new(move |raw: Raw| {
                let prev = prev.clone();
                let mapper = mapper.clone();
                async move {
                    let value = prev(raw).await?;
                    mapper(value).await
                }
                .boxed()
            }),
            len: self.len + 1,
        }
    }

    pub(crate) fn apply(&self, raw: Raw) -> BoxFuture<'static, Result<Out, StageError>> {
        (self.run)(raw)
    }
}

impl<Raw, Out> MapChain<Raw, Out> {
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl<Raw, Out> Clone for MapChain<Raw, Out> {
    fn clone(&self) -> Self {
        Self {
            run: self.run.clone(),
            len: self.len,
        }
    }
}

/// Immutable, type-state gated configuration for a proxy handler
///
/// Every configuration method consumes the builder and returns a new one;
/// strategies are shared behind `Arc`s, so cloning a partially configured
/// builder to derive several handlers is cheap:
///
/// ```
/// use relaybox::pipeline::{HandlerBuilder, HttpMethod, FetchOptions, StageError};
///
/// let base = HandlerBuilder::create().extend_fetch_options(|opts: FetchOptions| async move {
///     Ok::<_, StageError>(opts.header("X-Client", "docs"))
/// });
///
/// let list = base.clone().with_method(HttpMethod::Get).build("/users");
/// let create = base.with_method(HttpMethod::Post).build("/users");
/// assert_eq!(list.path(), create.path());
/// ```
///
/// `S` is the builder state (see [`super::state`]), `Raw` the fetcher's
/// response type and `Out` the type produced after all response mappers.
pub struct HandlerBuilder<S = Initial, Raw = Value, Out = Raw> {
    method: HttpMethod,
    body_provider: BodyProviderFn,
    extenders: Vec<ExtenderFn>,
    fetcher: Arc<dyn Fetcher<Raw>>,
    dummy: Option<DummyFn<Raw>>,
    mappers: MapChain<Raw, Out>,
    _state: PhantomData<S>,
}

fn no_body(_ctx: RequestContext) -> BoxFuture<'static, Result<Option<Value>, StageError>> {
    future::ready(Ok(None)).boxed()
}

impl HandlerBuilder<Initial, Value, Value> {
    /// Fresh builder: inherited method, no body, real HTTP fetcher, no mappers
    pub fn create() -> Self {
        Self {
            method: HttpMethod::Inherit,
            body_provider: Arc::new(no_body),
            extenders: Vec::new(),
            fetcher: Arc::new(HttpFetcher::default()),
            dummy: None,
            mappers: MapChain::identity(),
            _state: PhantomData,
        }
    }
}

impl Default for HandlerBuilder<Initial, Value, Value> {
    fn default() -> Self {
        Self::create()
    }
}

impl<S, Raw, Out> HandlerBuilder<S, Raw, Out>
where
    Raw: Send + 'static,
    Out: Send + 'static,
{
    pub fn with_method(self, method: HttpMethod) -> Self {
        Self { method, ..self }
    }

    /// Append an extender; extenders run in registration order, each
    /// receiving the previous one's output
    pub fn extend_fetch_options<F, Fut>(self, extender: F) -> Self
    where
        F: Fn(FetchOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FetchOptions, StageError>> + Send + 'static,
    {
        let mut extenders = self.extenders;
        extenders.push(Arc::new(move |options| extender(options).boxed()));
        Self { extenders, ..self }
    }

    /// Append a response mapper; mappers run in registration order
    pub fn post_map<F, Fut, Next>(self, mapper: F) -> HandlerBuilder<Locked, Raw, Next>
    where
        F: Fn(Out) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Next, StageError>> + Send + 'static,
        Next: Send + 'static,
    {
        let mapper: MapFn<Out, Next> = Arc::new(move |value| mapper(value).boxed());
        HandlerBuilder {
            method: self.method,
            body_provider: self.body_provider,
            extenders: self.extenders,
            fetcher: self.fetcher,
            dummy: self.dummy,
            mappers: self.mappers.then(mapper),
            _state: PhantomData,
        }
    }

    /// Freeze the configuration into a handler for `path` (relative to the base URL)
    pub fn build(self, path: impl Into<String>) -> Handler<Raw, Out> {
        Handler::new(Pipeline {
            path: path.into(),
            method: self.method,
            body_provider: self.body_provider,
            extenders: self.extenders,
            fetcher: self.fetcher,
            dummy: self.dummy,
            mappers: self.mappers,
        })
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn extender_count(&self) -> usize {
        self.extenders.len()
    }

    pub fn mapper_count(&self) -> usize {
        self.mappers.len()
    }

    pub fn has_dummy(&self) -> bool {
        self.dummy.is_some()
    }
}

impl<Raw> HandlerBuilder<Initial, Raw, Raw>
where
    Raw: Send + 'static,
{
    /// Replace the body provider; the returned value is serialized to JSON,
    /// `None`/`null` meaning "no body"
    pub fn with_body_provider<F, Fut, B>(self, provider: F) -> HandlerBuilder<BodyLocked, Raw, Raw>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B, StageError>> + Send + 'static,
        B: Serialize,
    {
        let body_provider: BodyProviderFn = Arc::new(move |ctx: RequestContext| {
            provider(ctx)
                .map(|body| -> Result<Option<Value>, StageError> {
                    match serde_json::to_value(body?)? {
                        Value::Null => Ok(None),
                        value => Ok(Some(value)),
                    }
                })
                .boxed()
        });

        HandlerBuilder {
            method: self.method,
            body_provider,
            extenders: self.extenders,
            fetcher: self.fetcher,
            dummy: self.dummy,
            mappers: self.mappers,
            _state: PhantomData,
        }
    }
}

impl<S, Raw> HandlerBuilder<S, Raw, Raw>
where
    S: AcceptsFetcher,
    Raw: Send + 'static,
{
    /// Replace the real fetcher with an async function
    pub fn with_fetcher<F, Fut, T>(self, fetcher: F) -> HandlerBuilder<FetcherLocked, T, T>
    where
        F: Fn(FetchOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, StageError>> + Send + 'static,
        T: Send + 'static,
    {
        self.with_fetch_strategy(fetcher)
    }

    /// Replace the real fetcher with any [`Fetcher`] implementation
    pub fn with_fetch_strategy<T, F>(self, fetcher: F) -> HandlerBuilder<FetcherLocked, T, T>
    where
        F: Fetcher<T> + 'static,
        T: Send + 'static,
    {
        HandlerBuilder {
            method: self.method,
            body_provider: self.body_provider,
            extenders: self.extenders,
            fetcher: Arc::new(fetcher),
            dummy: None,
            mappers: MapChain::identity(),
            _state: PhantomData,
        }
    }
}

impl<S, Raw> HandlerBuilder<S, Raw, Raw>
where
    S: AcceptsDummy,
    Raw: Send + 'static,
{
    /// Set the response used instead of the real fetcher while dummy mode is active
    pub fn with_dummy_fetcher(self, dummy: DummyFetcher<Raw>) -> HandlerBuilder<Locked, Raw, Raw>
    where
        Raw: Clone + Sync,
    {
        let dummy: DummyFn<Raw> = Arc::new(move |options: &FetchOptions| dummy.respond(options));

        HandlerBuilder {
            method: self.method,
            body_provider: self.body_provider,
            extenders: self.extenders,
            fetcher: self.fetcher,
            dummy: Some(dummy),
            mappers: self.mappers,
            _state: PhantomData,
        }
    }

    pub fn with_dummy_data(self, data: Raw) -> HandlerBuilder<Locked, Raw, Raw>
    where
        Raw: Clone + Sync,
    {
        self.with_dummy_fetcher(DummyFetcher::data(data))
    }

    pub fn with_dummy_fn<F>(self, f: F) -> HandlerBuilder<Locked, Raw, Raw>
    where
        F: Fn(&FetchOptions) -> Raw + Send + Sync + 'static,
        Raw: Clone + Sync,
    {
        self.with_dummy_fetcher(DummyFetcher::from_fn(f))
    }
}

impl<S, Raw, Out> Clone for HandlerBuilder<S, Raw, Out> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            body_provider: self.body_provider.clone(),
            extenders: self.extenders.clone(),
            fetcher: self.fetcher.clone(),
            dummy: self.dummy.clone(),
            mappers: self.mappers.clone(),
            _state: PhantomData,
        }
    }
}

impl<S, Raw, Out> fmt::Debug for HandlerBuilder<S, Raw, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBuilder")
            .field("state", &std::any::type_name::<S>())
            .field("method", &self.method)
            .field("extenders", &self.extenders.len())
            .field("dummy", &self.dummy.is_some())
            .field("mappers", &self.mappers.len)
            .finish()
    }
}
