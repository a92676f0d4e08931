/// API route handlers for the Atrium download proxy.
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use atrium_shared::{content_disposition, resolve_filename, resolve_target, ProxyError};

use crate::AppState;

// ====== REQUEST / RESPONSE TYPES ======

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub url: Option<String>,
    pub filename: Option<String>,
}

/// Plain-text error response wrapping a [`ProxyError`].
#[derive(Debug)]
pub struct ApiError(pub ProxyError);

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.0.to_string(),
        )
            .into_response()
    }
}

// ====== DOWNLOAD ROUTE ======

/// GET /api/download?url=..&filename=.. - Stream a panel file with a download filename
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("download", %request_id);
    proxy_download(&state, query).instrument(span).await
}

async fn proxy_download(state: &AppState, query: DownloadQuery) -> Result<Response, ApiError> {
    let config = &state.config;

    let target = resolve_target(query.url.as_deref(), &config.panel_api_url, &config.local_tls)
        .map_err(|e| log_failure(e, query.url.as_deref().unwrap_or_default()))?;

    let upstream = state
        .upstream
        .fetch(&target.fetch_url)
        .await
        .map_err(|e| log_failure(e, &target.fetch_url))?;

    let filename = resolve_filename(query.filename.as_deref(), &target.url);

    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let content_length = upstream
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    info!(
        "Streaming {} as {:?} ({}, {} bytes)",
        target.fetch_url,
        filename,
        content_type,
        content_length.map_or_else(|| "unknown".to_string(), |n| n.to_string())
    );

    // Dropping the body (client gone) drops the upstream stream with it.
    let body = Body::from_stream(upstream.bytes_stream());

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        body,
    )
        .into_response();

    if let Some(len) = content_length {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    Ok(response)
}

/// Refusals of bad client input are routine; upstream trouble is not.
fn log_failure(err: ProxyError, url: &str) -> ProxyError {
    if err.is_client_error() {
        info!("Rejected download url={:?}: {}", url, err);
    } else {
        warn!("Upstream fetch failed url={}: {}", url, err);
    }
    err
}

// ====== HEALTH ======

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "upstream": state.config.redacted_panel_url(),
        "timeout_secs": state.upstream.timeout().as_secs(),
    }))
}
