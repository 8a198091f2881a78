use std::net::SocketAddr;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::info;

use super::routes::{health, mount, route_handler};
use super::state::AppState;
use crate::config::Config;
use crate::pipeline::{HttpConfig, HttpFetcher};

pub type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build the application router: one proxy handler per configured route
pub fn router(config: &Config) -> Result<Router, AnyError> {
    let fetcher = HttpFetcher::new(HttpConfig {
        request_timeout: config.upstream.timeout(),
        user_agent: config.upstream.user_agent.clone(),
        ..HttpConfig::default()
    })?;

    let state = AppState::from_config(config);

    let mut app = Router::new().route("/health", get(health));
    for (name, route) in &config.routes {
        info!(route = %name, path = %route.path, target = route.target(), "Building route");
        let handler = route_handler(route, &config.upstream, fetcher.clone());
        app = mount(app, &route.path, handler);
    }

    Ok(app
        .with_state(state)
        // Automatically decompress gzip request bodies
        .layer(RequestDecompressionLayer::new()))
}

pub async fn run(config: Config, address: Option<SocketAddr>) -> Result<(), AnyError> {
    let address = address.unwrap_or(config.server.bind_addr);

    if config.upstream.base_url.is_none() {
        tracing::warn!("No upstream base URL configured; every proxied request will fail with 500");
    }
    if config.upstream.dummy_mode {
        info!("Dummy mode enabled; upstream will not be called");
    }

    let app = router(&config)?;

    let listener = TcpListener::bind(address).await?;
    info!(%address, routes = config.routes.len(), "relaybox listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
