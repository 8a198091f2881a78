use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, Uri, header},
    routing::any,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt; // for `oneshot`

use relaybox::api::{self, AppState};
use relaybox::config::Config;
use relaybox::pipeline::{HandlerBuilder, HttpMethod, RuntimeSettings, StageError};

/// Local upstream echoing what it received
async fn spawn_upstream() -> String {
    let app = Router::new()
        .route(
            "/missing",
            any(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "message": "no such user" })),
                )
            }),
        )
        .route(
            "/{*rest}",
            any(|method: Method, uri: Uri, headers: HeaderMap, body: Bytes| async move {
                let headers: serde_json::Map<String, Value> = headers
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.to_string(),
                            json!(value.to_str().unwrap_or_default()),
                        )
                    })
                    .collect();
                let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

                Json(json!({
                    "method": method.as_str(),
                    "path": uri.path(),
                    "query": uri.query(),
                    "headers": headers,
                    "body": body,
                }))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{address}")
}

fn config(upstream: &str) -> Config {
    let config_toml = format!(
        r#"
[server]
max_body_bytes = 256

[upstream]
base_url = "{upstream}"

[routes.create_user]
path = "/api/users"
target = "/users"
method = "post"
forward_headers = ["x-request-id"]
headers = {{ "x-source" = "relaybox" }}
dummy = {{ id = 0, name = "dummy" }}

[routes.list_users]
path = "/api/list"
target = "/users"
method = "get"

[routes.get_user]
path = "/api/users/{{id}}"
target = "/users/{{id}}"

[routes.missing]
path = "/api/missing"
target = "/missing"
forward_body = false
        "#
    );

    toml::from_str(&config_toml).expect("Failed to parse test config")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-request-id", "req-42")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = api::router(&config("http://127.0.0.1:1")).unwrap();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["dummyMode"], false);
    assert_eq!(body["metrics"]["invocations"], 0);
}

#[tokio::test]
async fn test_proxies_body_and_headers() {
    let upstream = spawn_upstream().await;
    let mut config = config(&upstream);
    config.upstream.token = Some("secret".to_string());
    let app = api::router(&config).unwrap();

    let (status, body) = send(app, post_json("/api/users", json!({ "name": "ada" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "POST");
    assert_eq!(body["path"], "/users");
    assert_eq!(body["body"], json!({ "name": "ada" }));
    assert_eq!(body["headers"]["x-source"], "relaybox");
    assert_eq!(body["headers"]["x-request-id"], "req-42");
    assert_eq!(body["headers"]["authorization"], "Bearer secret");
    assert_eq!(body["headers"]["content-type"], "application/json");
}

#[tokio::test]
async fn test_get_route_does_not_forward_body() {
    let upstream = spawn_upstream().await;
    let app = api::router(&config(&upstream)).unwrap();

    // The inbound body is neither JSON nor forwarded to a GET upstream
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/list")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("not json"))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "GET");
    assert_eq!(body["path"], "/users");
    assert_eq!(body["body"], Value::Null);
    assert!(body["headers"].get("content-type").is_none());
}

#[tokio::test]
async fn test_path_params_and_query_reach_upstream() {
    let upstream = spawn_upstream().await;
    let app = api::router(&config(&upstream)).unwrap();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/users/42?expand=true")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "GET");
    assert_eq!(body["path"], "/users/42");
    assert_eq!(body["query"], "expand=true");
    assert_eq!(body["body"], Value::Null);
}

#[tokio::test]
async fn test_upstream_status_is_preserved() {
    let upstream = spawn_upstream().await;
    let app = api::router(&config(&upstream)).unwrap();

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/missing")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["statusCode"], 404);
    assert_eq!(body["statusMessage"], "Not Found");
    assert_eq!(body["message"], "no such user");
    assert!(body["data"].get("originalError").is_some());
}

#[tokio::test]
async fn test_dummy_mode_serves_configured_response() {
    // Nothing listens on this port; dummy mode must not touch it
    let mut config = config("http://127.0.0.1:1");
    config.upstream.dummy_mode = true;
    let app = api::router(&config).unwrap();

    let (status, body) = send(
        app.clone(),
        post_json("/api/users", json!({ "name": "ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": 0, "name": "dummy" }));

    // Route without a dummy response is a configuration error
    let request = Request::builder()
        .uri("/api/missing")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["statusCode"], 500);
}

#[tokio::test]
async fn test_missing_base_url_is_configuration_error() {
    let mut config = config("http://unused");
    config.upstream.base_url = None;
    let app = api::router(&config).unwrap();

    let (status, body) = send(app, post_json("/api/users", json!({}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["statusMessage"], "Internal Server Error");
    assert_eq!(body["message"], "no upstream base URL configured");
}

#[tokio::test]
async fn test_rejects_invalid_and_oversized_bodies() {
    let upstream = spawn_upstream().await;
    let app = api::router(&config(&upstream)).unwrap();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = post_json("/api/users", json!({ "blob": "x".repeat(512) }));
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["statusCode"], 413);
}

#[derive(Debug, Deserialize, Serialize)]
struct Greeting {
    greeting: String,
}

#[tokio::test]
async fn test_mount_typed_handler() {
    let upstream = spawn_upstream().await;
    let state = AppState::new(
        RuntimeSettings {
            base_url: Some(upstream),
            dummy_mode: false,
        },
        1024,
    );

    let handler = HandlerBuilder::create()
        .with_method(HttpMethod::Get)
        .post_map(|raw: Value| async move {
            let path = raw["path"]
                .as_str()
                .ok_or_else(|| StageError::msg("upstream returned no path"))?
                .to_string();
            Ok::<_, StageError>(Greeting {
                greeting: format!("hello from {path}"),
            })
        })
        .build("/greetings");

    let app = api::mount(Router::new(), "/greet", handler).with_state(state.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/greet")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "greeting": "hello from /greetings" }));
    assert_eq!(state.metrics.snapshot().invocations, 1);
    assert_eq!(state.metrics.snapshot().failures, 0);
}

#[tokio::test]
async fn test_failures_are_counted() {
    let state = AppState::new(RuntimeSettings::default(), 1024);
    let handler = HandlerBuilder::create().build("/anything");
    let app = api::mount(Router::new(), "/x", handler).with_state(state.clone());

    let request = Request::builder().uri("/x").body(Body::empty()).unwrap();
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(state.metrics.snapshot().failures, 1);
}
