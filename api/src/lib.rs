//! Atrium API Server
//!
//! Download proxy in front of the panel API: validates the requested file
//! URL, fetches it with a bounded timeout and streams it back under a safe
//! filename.
pub mod config;
pub mod routes;
pub mod upstream;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use upstream::UpstreamClient;

/// Shared application state for all API handlers.
pub struct AppState {
    pub config: Config,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let upstream = UpstreamClient::new(
            config.upstream_timeout(),
            &config.panel_api_url,
            config.local_tls.clone(),
        )?;
        Ok(Self { config, upstream })
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/download", get(routes::download))
        .route("/api/health", get(routes::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
