//! Builder states
//!
//! Each state is a zero-sized marker carried by [`HandlerBuilder`] as a
//! phantom type parameter. A configuration method is only defined for the
//! states in which it is still allowed, so an invalid chain is rejected by
//! the compiler rather than at request time.
//!
//! | state           | body | fetcher | dummy | post_map |
//! |-----------------|------|---------|-------|----------|
//! | [`Initial`]     | yes  | yes     | yes   | yes      |
//! | [`BodyLocked`]  | no   | yes     | yes   | yes      |
//! | [`FetcherLocked`] | no | no      | yes   | yes      |
//! | [`Locked`]      | no   | no      | no    | yes      |
//!
//! `with_method`, `extend_fetch_options` and `build` are available in every state.
//!
//! A second body provider is rejected:
//!
//! ```compile_fail
//! use relaybox::pipeline::{HandlerBuilder, RequestContext, StageError};
//!
//! let _ = HandlerBuilder::create()
//!     .with_body_provider(|_ctx: RequestContext| async { Ok::<_, StageError>(1) })
//!     .with_body_provider(|_ctx: RequestContext| async { Ok::<_, StageError>(2) });
//! ```
//!
//! So is a body provider after a fetcher:
//!
//! ```compile_fail
//! use relaybox::pipeline::{FetchOptions, HandlerBuilder, RequestContext, StageError};
//!
//! let _ = HandlerBuilder::create()
//!     .with_fetcher(|opts: FetchOptions| async move { Ok::<_, StageError>(opts.url) })
//!     .with_body_provider(|_ctx: RequestContext| async { Ok::<_, StageError>(1) });
//! ```
//!
//! A second fetcher:
//!
//! ```compile_fail
//! use relaybox::pipeline::{FetchOptions, HandlerBuilder, StageError};
//!
//! let _ = HandlerBuilder::create()
//!     .with_fetcher(|opts: FetchOptions| async move { Ok::<_, StageError>(opts.url) })
//!     .with_fetcher(|opts: FetchOptions| async move { Ok::<_, StageError>(opts.url) });
//! ```
//!
//! A body provider after a dummy fetcher:
//!
//! ```compile_fail
//! use relaybox::pipeline::{HandlerBuilder, RequestContext, StageError};
//! use serde_json::json;
//!
//! let _ = HandlerBuilder::create()
//!     .with_dummy_data(json!({ "ok": true }))
//!     .with_body_provider(|_ctx: RequestContext| async { Ok::<_, StageError>(1) });
//! ```
//!
//! A fetcher after a dummy fetcher:
//!
//! ```compile_fail
//! use relaybox::pipeline::{FetchOptions, HandlerBuilder, StageError};
//! use serde_json::json;
//!
//! let _ = HandlerBuilder::create()
//!     .with_dummy_data(json!({ "ok": true }))
//!     .with_fetcher(|opts: FetchOptions| async move { Ok::<_, StageError>(opts.url) });
//! ```
//!
//! A second dummy fetcher:
//!
//! ```compile_fail
//! use relaybox::pipeline::HandlerBuilder;
//! use serde_json::json;
//!
//! let _ = HandlerBuilder::create()
//!     .with_dummy_data(json!({ "a": 1 }))
//!     .with_dummy_data(json!({ "b": 2 }));
//! ```
//!
//! Anything but `post_map` after `post_map`:
//!
//! ```compile_fail
//! use relaybox::pipeline::{HandlerBuilder, RequestContext, StageError};
//! use serde_json::Value;
//!
//! let _ = HandlerBuilder::create()
//!     .post_map(|r: Value| async move { Ok::<_, StageError>(r) })
//!     .with_body_provider(|_ctx: RequestContext| async { Ok::<_, StageError>(1) });
//! ```
//!
//! ```compile_fail
//! use relaybox::pipeline::{FetchOptions, HandlerBuilder, StageError};
//! use serde_json::Value;
//!
//! let _ = HandlerBuilder::create()
//!     .post_map(|r: Value| async move { Ok::<_, StageError>(r) })
//!     .with_fetcher(|opts: FetchOptions| async move { Ok::<_, StageError>(opts.url) });
//! ```
//!
//! ```compile_fail
//! use relaybox::pipeline::{HandlerBuilder, StageError};
//! use serde_json::{Value, json};
//!
//! let _ = HandlerBuilder::create()
//!     .post_map(|r: Value| async move { Ok::<_, StageError>(r) })
//!     .with_dummy_data(json!({ "ok": true }));
//! ```
//!
//! A built handler is not a builder:
//!
//! ```compile_fail
//! use relaybox::pipeline::HandlerBuilder;
//! use relaybox::pipeline::HttpMethod;
//!
//! let _ = HandlerBuilder::create().build("/users").with_method(HttpMethod::Get);
//! ```
//!
//! [`HandlerBuilder`]: super::HandlerBuilder

mod sealed {
    pub trait Sealed {}
}

/// Marker for every builder state
pub trait BuilderState: sealed::Sealed {}

/// States in which a fetcher may still be set
pub trait AcceptsFetcher: BuilderState {}

/// States in which a dummy fetcher may still be set
pub trait AcceptsDummy: BuilderState {}

/// Fresh builder; every configuration method is available
#[derive(Debug, Clone, Copy, Default)]
pub struct Initial;

/// Body provider set
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyLocked;

/// Real fetcher set
#[derive(Debug, Clone, Copy, Default)]
pub struct FetcherLocked;

/// Dummy fetcher set or response mapping started; only `post_map` remains
#[derive(Debug, Clone, Copy, Default)]
pub struct Locked;

impl sealed::Sealed for Initial {}
impl sealed::Sealed for BodyLocked {}
impl sealed::Sealed for FetcherLocked {}
impl sealed::Sealed for Locked {}

impl BuilderState for Initial {}
impl BuilderState for BodyLocked {}
impl BuilderState for FetcherLocked {}
impl BuilderState for Locked {}

impl AcceptsFetcher for Initial {}
impl AcceptsFetcher for BodyLocked {}

impl AcceptsDummy for Initial {}
impl AcceptsDummy for BodyLocked {}
impl AcceptsDummy for FetcherLocked {}
