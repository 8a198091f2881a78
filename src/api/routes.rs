//! Serving handlers as axum routes

use axum::{
    Json, Router,
    extract::{Request, State},
    response::{IntoResponse, Response},
    routing::any,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use super::extract::request_context;
use super::state::AppState;
use crate::config::{RouteConfig, UpstreamConfig};
use crate::pipeline::{
    Handler, HandlerBuilder, HandlerError, HttpFetcher, RequestContext, bodies, extenders,
};

/// Serve `handler` at `path` for every HTTP method
///
/// Successful results are returned as JSON with status 200; failures use
/// the normalized error's status code and body.
pub fn mount<Raw, Out>(router: Router<AppState>, path: &str, handler: Handler<Raw, Out>) -> Router<AppState>
where
    Raw: Send + 'static,
    Out: Serialize + Send + 'static,
{
    info!(path, upstream_path = handler.path(), method = %handler.method(), "Mounting handler");

    router.route(
        path,
        any(move |State(state): State<AppState>, request: Request| {
            let handler = handler.clone();
            async move { dispatch(handler, state, request).await }
        }),
    )
}

async fn dispatch<Raw, Out>(handler: Handler<Raw, Out>, state: AppState, request: Request) -> Response
where
    Raw: Send + 'static,
    Out: Serialize + Send + 'static,
{
    state.metrics.invocation();

    let result = match request_context(request, &state).await {
        Ok(ctx) => handler.handle(ctx).await,
        Err(err) => Err(HandlerError::normalize(err)),
    };

    match result {
        Ok(out) => {
            if state.runtime.dummy_mode {
                state.metrics.dummy_response();
            }
            Json(out).into_response()
        }
        Err(err) => {
            state.metrics.failure();
            err.into_response()
        }
    }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "dummyMode": state.runtime.dummy_mode,
        "metrics": state.metrics.snapshot(),
    }))
}

/// Build the proxy handler for a configured route
///
/// `{name}` placeholders in the target are filled from the inbound route
/// parameters and the inbound query string is forwarded unless disabled.
pub fn route_handler(
    route: &RouteConfig,
    upstream: &UpstreamConfig,
    fetcher: HttpFetcher,
) -> Handler<Value, Value> {
    let body_route = route.clone();
    let method = route.method;

    let builder = HandlerBuilder::create()
        .with_method(method)
        .with_body_provider(move |ctx: RequestContext| {
            let forward = body_route.forwards_body(&method.resolve(ctx.method()));
            async move {
                if forward {
                    bodies::json_body(ctx).await
                } else {
                    Ok(None)
                }
            }
        })
        .extend_fetch_options(extenders::path_params())
        .extend_fetch_options(extenders::set_headers(route.headers.clone()))
        .extend_fetch_options(extenders::forward_headers(route.forward_headers.clone()))
        .extend_fetch_options(extenders::timeout(route.timeout(upstream)));

    let builder = if route.forward_query {
        builder.extend_fetch_options(extenders::forward_query())
    } else {
        builder
    };

    let builder = match &upstream.token {
        Some(token) => builder.extend_fetch_options(extenders::bearer_token(token.clone())),
        None => builder,
    };

    let builder = builder.with_fetch_strategy(fetcher);

    match &route.dummy {
        Some(dummy) => builder.with_dummy_data(dummy.clone()).build(route.target()),
        None => builder.build(route.target()),
    }
}
