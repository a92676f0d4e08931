/// Error taxonomy for the Atrium download proxy.
use thiserror::Error;

/// Everything that can stop a download before its body starts streaming.
///
/// The `Display` text is the plain-text body sent to the client, so it must
/// stay short and never include internal details.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Missing `url`, or one outside the allowed origin/shape. Never hits the network.
    #[error("{0}")]
    InvalidRequest(String),

    /// Upstream answered, but with a non-2xx status.
    #[error("Upstream server responded with status {status}")]
    UpstreamRejected { status: u16 },

    #[error("Upstream server did not respond within {secs}s (timeout)")]
    UpstreamTimeout { secs: u64 },

    #[error("Could not reach the upstream server, is the backend running? ({0})")]
    UpstreamUnreachable(String),
}

impl ProxyError {
    pub fn invalid_url() -> Self {
        ProxyError::InvalidRequest("Invalid URL".to_string())
    }

    pub fn url_required() -> Self {
        ProxyError::InvalidRequest("URL required".to_string())
    }

    /// HTTP status code the client receives for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::InvalidRequest(_) => 400,
            ProxyError::UpstreamRejected { status } if (100..=999).contains(status) => *status,
            ProxyError::UpstreamRejected { .. } => 502,
            ProxyError::UpstreamTimeout { .. } | ProxyError::UpstreamUnreachable(_) => 502,
        }
    }

    /// Whether the request was refused before any outbound call.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ProxyError::InvalidRequest(_))
    }
}

/// Result type alias for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;
