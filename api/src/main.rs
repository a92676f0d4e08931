use std::sync::Arc;

use atrium_api::config::Config;
use atrium_api::{router, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atrium_api=info,atrium_shared=info,tower_http=info".into()),
        )
        .init();

    // Config
    let config = Config::from_env()?;
    info!("Panel API: {}", config.redacted_panel_url());
    info!(
        "Upstream timeout: {}s, local TLS downgrade: {} ({})",
        config.upstream_timeout_secs,
        config.local_tls.enabled,
        config.local_tls.hosts.join(", ")
    );
    let addr = config.bind_addr();

    // App state
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    // Bind
    info!("Atrium API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
