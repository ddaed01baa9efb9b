//! HTTP cache control module
//!
//! Provides `ETag` handling, conditional request matching and the
//! cacheability check for the browser cache default.

use hyper::header::{AUTHORIZATION, RANGE};
use hyper::HeaderMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default browser cache policy: cache, but revalidate every time
pub const CACHE_CONTROL_BROWSER: &str = "public, max-age=0, must-revalidate";

/// Generate an unquoted content key using fast hashing
///
/// # Arguments
/// * `content` - File content
///
/// # Returns
/// Hex digest, e.g., `abc123def`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("{v:016x}")
}

/// Wrap an `ETag` in quotes unless it already is quoted
pub fn quote_etag(etag: &str) -> String {
    if etag.len() >= 2 && etag.starts_with('"') && etag.ends_with('"') {
        etag.to_string()
    } else {
        format!("\"{etag}\"")
    }
}

/// A request may receive a shared cache directive only when it carries
/// neither credentials nor a byte range
pub fn is_cacheable(request_headers: &HeaderMap) -> bool {
    !request_headers.contains_key(AUTHORIZATION) && !request_headers.contains_key(RANGE)
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Strong `ETag`: `"abc123"`
/// - Weak `ETag`: `W/"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Wildcard: `*`
///
/// # Returns
/// Returns true if matched (should return 304), false otherwise
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let strong = quote_etag(etag);
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == strong
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_generate_etag() {
        let etag = generate_etag(b"hello world");
        assert_eq!(etag.len(), 16);
        assert!(etag.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_etag_consistency() {
        assert_eq!(generate_etag(b"same content"), generate_etag(b"same content"));
        assert_ne!(generate_etag(b"content a"), generate_etag(b"content b"));
    }

    #[test]
    fn test_quote_etag() {
        assert_eq!(quote_etag("abc"), "\"abc\"");
        assert_eq!(quote_etag("\"abc\""), "\"abc\"");
        assert_eq!(quote_etag("\""), "\"\"\"");
    }

    #[test]
    fn test_check_etag_match() {
        let etag = "abc123";
        assert!(check_etag_match(Some("\"abc123\""), etag));
        assert!(check_etag_match(Some("W/\"abc123\""), etag));
        assert!(check_etag_match(Some("\"xyz\", \"abc123\""), etag));
        assert!(check_etag_match(Some("*"), etag));
        assert!(!check_etag_match(Some("\"different\""), etag));
        assert!(!check_etag_match(Some("abc123"), etag));
        assert!(!check_etag_match(None, etag));
    }

    #[test]
    fn test_is_cacheable() {
        let mut headers = HeaderMap::new();
        assert!(is_cacheable(&headers));

        headers.insert(RANGE, HeaderValue::from_static("bytes=0-10"));
        assert!(!is_cacheable(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        assert!(!is_cacheable(&headers));
    }
}
