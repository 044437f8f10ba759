//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Whether a path is already an absolute http(s) URL.
pub fn is_absolute_http(href: &str) -> bool {
    let lower = href.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Append a `_=<millis>` query parameter so CDNs serve a fresh copy.
pub fn with_cache_buster(url: &str, millis: i64) -> Result<String, url::ParseError> {
    let mut parsed = Url::parse(url)?;
    parsed
        .query_pairs_mut()
        .append_pair("_", &millis.to_string());
    Ok(parsed.to_string())
}
