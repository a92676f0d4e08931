//! Filename resolution for proxied downloads.
//!
//! The client may ask for a display name, but it is untrusted: it is
//! sanitized, and an extension is borrowed from the upstream URL when the
//! name does not already end in a known one.

/// File types the proxy recognizes as real extensions.
pub const KNOWN_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "zip", "rar", "png", "jpg", "jpeg",
    "gif", "webp",
];

/// Name used when nothing usable is left.
pub const FALLBACK_NAME: &str = "document";

const MAX_EXTENSION_LEN: usize = 10;

pub fn is_known_extension(ext: &str) -> bool {
    KNOWN_EXTENSIONS.iter().any(|k| k.eq_ignore_ascii_case(ext))
}

/// Lowercased extension of `name`, if the part after the last dot looks like one.
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Strip everything except ASCII alphanumerics, Latin-1/Latin Extended
/// letters, `.`, `_`, `-` and whitespace. Empty results become [`FALLBACK_NAME`].
pub fn sanitize(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|&c| {
            c.is_ascii_alphanumeric()
                || (('\u{00C0}'..='\u{024F}').contains(&c) && !matches!(c, '\u{00D7}' | '\u{00F7}'))
                || matches!(c, '.' | '_' | '-')
                || c.is_whitespace()
        })
        .collect();
    let trimmed = kept.trim();
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Last non-empty path segment of `url`, percent-decoded, without query or fragment.
pub fn url_segment(url: &str) -> Option<String> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Some(decoded)
}

/// Pick the name the browser should save the download under.
pub fn resolve_filename(client: Option<&str>, url: &str) -> String {
    let segment = url_segment(url);
    let url_ext = segment.as_deref().and_then(extension_of);

    if let Some(requested) = client.filter(|s| !s.is_empty()) {
        let clean = sanitize(requested);
        if extension_of(&clean).is_some_and(|e| is_known_extension(&e)) {
            return clean;
        }
        return match url_ext.filter(|e| is_known_extension(e)) {
            Some(ext) => format!("{}.{}", clean, ext),
            None => clean,
        };
    }

    match (segment, url_ext) {
        (Some(segment), Some(ext)) if is_known_extension(&ext) => sanitize(&segment),
        (_, Some(ext)) => format!("{}.{}", FALLBACK_NAME, ext),
        _ => FALLBACK_NAME.to_string(),
    }
}

/// `Content-Disposition` value carrying both a legacy ASCII `filename` and
/// an RFC 5987 `filename*`.
pub fn content_disposition(filename: &str) -> String {
    let mut ascii = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            '"' | '\\' => {
                ascii.push('\\');
                ascii.push(c);
            }
            ' '..='~' => ascii.push(c),
            _ => ascii.push('_'),
        }
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(filename)
    )
}
