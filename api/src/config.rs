/// Process configuration, read from the environment once at startup.
use std::time::Duration;

use atrium_shared::LocalTls;
use thiserror::Error;

pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 15;
const DEFAULT_LOCAL_TLS_HOSTS: &str = "localhost,127.0.0.1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be an http(s) URL, got {value:?}")]
    InvalidUrl { name: &'static str, value: String },
}

/// Immutable settings shared by every request.
#[derive(Debug, Clone)]
pub struct Config {
    /// Panel API base URL, without a trailing slash.
    pub panel_api_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub upstream_timeout_secs: u64,
    pub local_tls: LocalTls,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Unparseable optional
    /// values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("PANEL_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("PANEL_API_URL"))?;
        let lower = raw_url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl {
                name: "PANEL_API_URL",
                value: raw_url,
            });
        }
        let panel_api_url = raw_url.trim_end_matches('/').to_string();

        let api_host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port: u16 = lookup("API_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(8081);
        let upstream_timeout_secs: u64 = lookup("UPSTREAM_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);

        let downgrade = lookup("LOCAL_TLS_DOWNGRADE")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);
        let hosts = lookup("LOCAL_TLS_HOSTS").unwrap_or_else(|| DEFAULT_LOCAL_TLS_HOSTS.to_string());
        let local_tls = LocalTls::from_host_list(downgrade, &hosts);

        Ok(Self {
            panel_api_url,
            api_host,
            api_port,
            upstream_timeout_secs,
            local_tls,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Panel URL safe to show in logs and health output: userinfo removed.
    pub fn redacted_panel_url(&self) -> String {
        match url::Url::parse(&self.panel_api_url) {
            Ok(mut parsed) => {
                let _ = parsed.set_username("");
                let _ = parsed.set_password(None);
                parsed.as_str().trim_end_matches('/').to_string()
            }
            Err(_) => "<unparseable panel url>".to_string(),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
