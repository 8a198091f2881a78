//! Typed staged handler builder
//!
//! A handler is composed from four pluggable strategies, run in this order
//! for every inbound request:
//!
//! 1. body provider: derives the upstream request body from the inbound request
//! 2. fetch-option extenders: ordered left-to-right fold over [`FetchOptions`]
//! 3. fetcher: the real HTTP [`HttpFetcher`] or a custom [`Fetcher`];
//!    replaced by the [`DummyFetcher`] while dummy mode is active
//! 4. response mappers: ordered left-to-right fold over the response
//!
//! Any failure short-circuits the remaining stages and is normalized once
//! into a [`HandlerError`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use relaybox::pipeline::{FetchOptions, HandlerBuilder, HttpMethod, RequestContext, StageError};
//! use serde_json::{Value, json};
//!
//! # async fn run(ctx: RequestContext) -> Result<(), relaybox::pipeline::HandlerError> {
//! let handler = HandlerBuilder::create()
//!     .with_method(HttpMethod::Post)
//!     .with_body_provider(|ctx: RequestContext| async move { ctx.json::<Value>() })
//!     .extend_fetch_options(|opts: FetchOptions| async move {
//!         Ok::<_, StageError>(opts.header("X-Source", "relaybox"))
//!     })
//!     .with_dummy_data(json!({ "id": 1 }))
//!     .post_map(|user: Value| async move { Ok::<_, StageError>(json!({ "user": user })) })
//!     .build("/users");
//!
//! let _created = handler.handle(ctx).await?;
//! # Ok(())
//! # }
//! ```

pub mod bodies;
mod builder;
mod context;
mod engine;
mod error;
pub mod extenders;
mod fetcher;
mod options;
pub mod state;

pub use builder::HandlerBuilder;
pub use context::{AbortHandle, AbortSignal, RequestContext, RuntimeSettings, abort_pair};
pub use engine::Handler;
pub use error::{
    BoxError, ConfigurationError, DEFAULT_ERROR_MESSAGE, ErrorData, HandlerError, StageError,
};
pub use fetcher::{DummyFetcher, Fetcher, HttpConfig, HttpFetcher};
pub use options::{FetchOptions, HeadersMap, HttpMethod, ParseMethodError, join_url};
