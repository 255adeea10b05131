use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::{app_state::AppState, config::ServerConfig, routes, swagger};

pub const API_TITLE: &str = "Arcade Storefront API";

/// Installs the global fmt subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Loads `.env` into the process environment if present.
pub fn init_env() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }
}

/// Assembles every route, the OpenAPI document and Swagger UI into a ready-to-serve router.
pub fn app(state: AppState) -> Router {
    let (router, openapi) = routes::routes_with_openapi().split_for_parts();
    let openapi =
        swagger::finalize_openapi(openapi, API_TITLE, &state.config.auth.session_cookie_name);

    router
        .merge(swagger::create_swagger_ui(openapi))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the listener and serves `app` until ctrl-c.
pub async fn serve(service_name: &str, app: Router, server: &ServerConfig) -> Result<()> {
    let address = format!("{}:{}", server.host, server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!("{} listening on {}", service_name, address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;

    tracing::info!("{} stopped", service_name);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for the shutdown signal: {}", err);
    }
}
