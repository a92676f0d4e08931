/// Outbound requests to the panel API.
use std::time::Duration;

use atrium_shared::{is_within_base, LocalTls, ProxyError, ProxyResult};
use reqwest::redirect::Policy;
use tracing::warn;

const MAX_REDIRECTS: usize = 5;

/// Pooled HTTP client with the per-request upstream timeout.
pub struct UpstreamClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(timeout: Duration, base: &str, local_tls: LocalTls) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .redirect(same_origin_redirects(base.to_string(), local_tls))
            .build()?;
        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Single GET to `url`. The timeout covers everything up to the response
    /// headers; the body is left unread for the caller to stream.
    ///
    /// Non-2xx answers come back as [`ProxyError::UpstreamRejected`] carrying
    /// the upstream status so callers can tell "no such file" apart from
    /// "cannot reach the panel".
    pub async fn fetch(&self, url: &str) -> ProxyResult<reqwest::Response> {
        let secs = self.timeout.as_secs();
        let response = match tokio::time::timeout(self.timeout, self.http.get(url).send()).await {
            Err(_) => return Err(ProxyError::UpstreamTimeout { secs }),
            Ok(Err(e)) => return Err(classify(e, secs)),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::UpstreamRejected {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

/// Follow redirects only while they stay under the panel base. A stopped
/// redirect surfaces as a non-2xx answer and is never streamed.
fn same_origin_redirects(base: String, local_tls: LocalTls) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            warn!("Too many upstream redirects, stopping at {}", attempt.url());
            return attempt.stop();
        }
        if is_within_base(attempt.url().as_str(), &base, &local_tls) {
            attempt.follow()
        } else {
            warn!("Refusing upstream redirect to foreign origin {}", attempt.url());
            attempt.stop()
        }
    })
}

fn classify(err: reqwest::Error, secs: u64) -> ProxyError {
    if err.is_timeout() {
        return ProxyError::UpstreamTimeout { secs };
    }
    if err.is_builder() {
        return ProxyError::invalid_url();
    }
    warn!("Upstream request failed: {}", err);
    let reason = if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    ProxyError::UpstreamUnreachable(reason.to_string())
}
