//! Validation and normalization of the `url` a client asks the proxy to fetch.
//!
//! Only URLs under the configured upstream base are accepted. Absolute URLs
//! are compared after the local TLS downgrade so that a panel served over
//! plain HTTP on localhost still matches links that were rendered with
//! `https://`.
use crate::errors::{ProxyError, ProxyResult};

/// Localhost https -> http rewrite policy.
///
/// Local panel backends usually run without a usable certificate, so links
/// pointing at them are fetched over plain HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTls {
    pub enabled: bool,
    /// Hostnames (no port, no brackets) the rewrite applies to.
    pub hosts: Vec<String>,
}

impl Default for LocalTls {
    fn default() -> Self {
        Self {
            enabled: true,
            hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
        }
    }
}

impl LocalTls {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            hosts: Vec::new(),
        }
    }

    /// Build a policy from a comma separated host list (`localhost,127.0.0.1,::1`).
    pub fn from_host_list(enabled: bool, list: &str) -> Self {
        let hosts = list
            .split(',')
            .map(|h| h.trim().trim_start_matches('[').trim_end_matches(']'))
            .filter(|h| !h.is_empty())
            .map(|h| h.to_ascii_lowercase())
            .collect();
        Self { enabled, hosts }
    }

    /// Rewrite `https://<local host>` to `http://<local host>`.
    ///
    /// Any other URL is returned unchanged, as is everything when the policy
    /// is disabled.
    pub fn downgrade(&self, url: &str) -> String {
        if !self.enabled {
            return url.to_string();
        }
        let Some(rest) = strip_scheme(url, "https://") else {
            return url.to_string();
        };
        let host = host_of(rest);
        if self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            format!("http://{}", rest)
        } else {
            url.to_string()
        }
    }
}

/// A client-supplied URL that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Absolute URL as validated (relative inputs are joined to the base).
    pub url: String,
    /// URL the outbound request goes to, after the local TLS downgrade.
    pub fetch_url: String,
}

/// Validate `raw` against the upstream `base` and work out what to fetch.
pub fn resolve_target(raw: Option<&str>, base: &str, tls: &LocalTls) -> ProxyResult<ResolvedTarget> {
    let raw = raw
        .filter(|s| !s.is_empty())
        .ok_or_else(ProxyError::url_required)?;
    let base = base.trim_end_matches('/');

    let url = if strip_scheme(raw, "http://").is_some() || strip_scheme(raw, "https://").is_some() {
        if !is_within_base(raw, base, tls) {
            tracing::debug!("Rejected foreign origin: {}", raw);
            return Err(ProxyError::invalid_url());
        }
        raw.to_string()
    } else if raw.starts_with('/') {
        format!("{}{}", base, raw)
    } else {
        return Err(ProxyError::invalid_url());
    };

    let fetch_url = tls.downgrade(&url);
    Ok(ResolvedTarget { url, fetch_url })
}

/// Whether the absolute `url` lies under `base` once both went through the
/// local TLS downgrade. Used for client URLs and for upstream redirects.
pub fn is_within_base(url: &str, base: &str, tls: &LocalTls) -> bool {
    let base = base.trim_end_matches('/');
    is_under_base(&tls.downgrade(url), &tls.downgrade(base))
}

/// `url` starts with `base` and the match ends on a URL boundary, so
/// `http://host:8080.evil.com` does not pass for base `http://host:8080`.
fn is_under_base(url: &str, base: &str) -> bool {
    if base.is_empty() {
        return false;
    }
    match url.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let head = url.get(..scheme.len())?;
    if head.eq_ignore_ascii_case(scheme) {
        url.get(scheme.len()..)
    } else {
        None
    }
}

/// Host part of `host[:port][/path]`, without userinfo, port or IPv6 brackets.
fn host_of(after_scheme: &str) -> &str {
    let authority = after_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    if let Some(v6) = host_port.strip_prefix('[') {
        return v6.split(']').next().unwrap_or_default();
    }
    host_port.split(':').next().unwrap_or_default()
}
