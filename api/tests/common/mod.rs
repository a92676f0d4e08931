//! Shared helpers for download proxy integration tests: an in-process fake
//! panel API and a router wired against it.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use atrium_api::config::Config;
use atrium_api::{router, AppState};
use atrium_shared::LocalTls;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use http_body_util::BodyExt;

pub const PDF_BODY: &[u8] = b"%PDF-1.4 fake report body";
pub const ZIP_BODY: &[u8] = b"PK\x03\x04 fake archive";
pub const RAW_BODY: &[u8] = b"raw bytes without a type";
pub const FOREIGN_BODY: &[u8] = b"FOREIGN ORIGIN BYTES";
pub const CHUNK_SIZE: usize = 1024;

/// Fake panel API. Every request bumps the hit counter.
pub struct FakePanel {
    pub base_url: String,
    pub hits: Arc<AtomicUsize>,
    /// Set once the body of `/uploads/endless.pdf` has been dropped.
    pub stream_dropped: Arc<AtomicBool>,
    /// Second server the panel redirects `/uploads/elsewhere.pdf` to.
    pub foreign: ForeignServer,
}

impl FakePanel {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }
}

/// Server on another origin, counting what reaches it.
pub struct ForeignServer {
    pub base_url: String,
    pub hits: Arc<AtomicUsize>,
}

impl ForeignServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct PanelState {
    hits: Arc<AtomicUsize>,
    stream_dropped: Arc<AtomicBool>,
    foreign_url: String,
}

/// Flags the endless body as dropped when the stream owning it goes away.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn endless_body(dropped: Arc<AtomicBool>) -> Body {
    let stream = futures::stream::unfold(DropFlag(dropped), |flag| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Some((Ok::<_, Infallible>(Bytes::from(vec![b'x'; CHUNK_SIZE])), flag))
    });
    Body::from_stream(stream)
}

fn redirect_to(location: &str) -> Response {
    let mut resp = StatusCode::FOUND.into_response();
    if let Ok(value) = HeaderValue::from_str(location) {
        resp.headers_mut().insert(header::LOCATION, value);
    }
    resp
}

async fn serve_file(State(state): State<PanelState>, uri: Uri) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    match uri.path() {
        "/uploads/moved.pdf" => redirect_to("/uploads/report.pdf"),
        "/uploads/elsewhere.pdf" => redirect_to(&format!("{}/secret.pdf", state.foreign_url)),
        "/uploads/endless.pdf" => {
            let mut resp = Response::new(endless_body(state.stream_dropped.clone()));
            resp.headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
            resp
        }
        "/uploads/report.pdf" => ([(header::CONTENT_TYPE, "application/pdf")], PDF_BODY).into_response(),
        "/uploads/archive.zip" => ([(header::CONTENT_TYPE, "application/zip")], ZIP_BODY).into_response(),
        "/uploads/noext" => Response::new(Body::from(RAW_BODY)),
        "/uploads/slow.pdf" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            ([(header::CONTENT_TYPE, "application/pdf")], PDF_BODY).into_response()
        }
        _ => (StatusCode::NOT_FOUND, "{\"error\":\"not found\"}").into_response(),
    }
}

async fn serve_foreign(State(hits): State<Arc<AtomicUsize>>) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "application/pdf")], FOREIGN_BODY).into_response()
}

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake server");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake server");
    });
    format!("http://127.0.0.1:{}", port)
}

/// Start the fake panel (and its foreign neighbour) on ephemeral ports.
pub async fn start_panel() -> FakePanel {
    let foreign_hits = Arc::new(AtomicUsize::new(0));
    let foreign_url = spawn_server(
        Router::new()
            .fallback(serve_foreign)
            .with_state(foreign_hits.clone()),
    )
    .await;

    let state = PanelState {
        hits: Arc::new(AtomicUsize::new(0)),
        stream_dropped: Arc::new(AtomicBool::new(false)),
        foreign_url: foreign_url.clone(),
    };
    let base_url = spawn_server(Router::new().fallback(serve_file).with_state(state.clone())).await;

    FakePanel {
        base_url,
        hits: state.hits,
        stream_dropped: state.stream_dropped,
        foreign: ForeignServer {
            base_url: foreign_url,
            hits: foreign_hits,
        },
    }
}

/// Base URL of a port nothing is listening on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind unused port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// Proxy router pointed at `base_url`.
pub fn build_app(base_url: &str, timeout_secs: u64) -> Router {
    let config = Config {
        panel_api_url: base_url.to_string(),
        api_host: "127.0.0.1".to_string(),
        api_port: 0,
        upstream_timeout_secs: timeout_secs,
        local_tls: LocalTls::default(),
    };
    router(Arc::new(AppState::new(config).expect("app state")))
}

/// `/api/download` URI with properly encoded query parameters.
pub fn download_uri(url: &str, filename: Option<&str>) -> String {
    let mut uri = format!("/api/download?url={}", urlencoding::encode(url));
    if let Some(name) = filename {
        uri.push_str(&format!("&filename={}", urlencoding::encode(name)));
    }
    uri
}

pub async fn body_bytes(resp: Response) -> Vec<u8> {
    resp.into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
        .to_vec()
}

pub async fn body_text(resp: Response) -> String {
    String::from_utf8(body_bytes(resp).await).expect("utf-8 body")
}

pub fn header_str(resp: &Response, name: header::HeaderName) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
