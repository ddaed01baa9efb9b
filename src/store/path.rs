//! Asset path normalization
//!
//! Request paths are percent-decoded and checked before they ever reach
//! the asset index.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt;

use crate::error::PathRejection;

/// Characters escaped when a path is written back into a `Location` header
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Normalized, decoded request path used as the asset index key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetPath(String);

impl AssetPath {
    /// Decode and validate a raw request path
    ///
    /// Rejects relative paths, invalid UTF-8 after decoding, NUL bytes,
    /// backslashes and any `.` or `..` segment.
    pub fn parse(raw: &str) -> Result<Self, PathRejection> {
        if !raw.starts_with('/') {
            return Err(PathRejection::NotAbsolute(raw.to_string()));
        }

        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| PathRejection::InvalidEncoding(raw.to_string()))?;

        if decoded.contains('\0') || decoded.contains('\\') {
            return Err(PathRejection::Traversal(raw.to_string()));
        }
        if decoded.split('/').any(|segment| segment == ".." || segment == ".") {
            return Err(PathRejection::Traversal(raw.to_string()));
        }

        Ok(Self(decoded.into_owned()))
    }

    /// Build a path known to be normalized (index keys, derived candidates)
    pub(crate) fn from_normalized(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extension of the last segment, if it has one
    pub fn extension(&self) -> Option<&str> {
        let name = self.0.rsplit('/').next()?;
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// Percent-encode for use in a `Location` header
    pub fn encoded(&self) -> String {
        utf8_percent_encode(&self.0, PATH_ENCODE_SET).to_string()
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        assert_eq!(AssetPath::parse("/foo/bar.html").unwrap().as_str(), "/foo/bar.html");
        assert_eq!(AssetPath::parse("/").unwrap().as_str(), "/");
    }

    #[test]
    fn test_parse_decodes() {
        assert_eq!(AssetPath::parse("/caf%C3%A9").unwrap().as_str(), "/café");
        assert_eq!(AssetPath::parse("/a%20b").unwrap().as_str(), "/a b");
    }

    #[test]
    fn test_parse_rejects_traversal() {
        for raw in ["/../etc/passwd", "/a/../b", "/a/%2e%2e/b", "/a/..", "/./a", "/a%5C..%5Cb", "/a%00"] {
            assert!(
                matches!(AssetPath::parse(raw), Err(PathRejection::Traversal(_))),
                "expected {raw} to be rejected"
            );
        }
    }

    #[test]
    fn test_dots_inside_names_allowed() {
        assert!(AssetPath::parse("/a..b/c.d").is_ok());
        assert!(AssetPath::parse("/.well-known/x").is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_encoding_and_relative() {
        assert!(matches!(
            AssetPath::parse("/%FF"),
            Err(PathRejection::InvalidEncoding(_))
        ));
        assert!(matches!(
            AssetPath::parse("foo"),
            Err(PathRejection::NotAbsolute(_))
        ));
    }

    #[test]
    fn test_extension() {
        let ext = |raw: &str| AssetPath::parse(raw).unwrap().extension().map(str::to_string);
        assert_eq!(ext("/css/site.min.css").as_deref(), Some("css"));
        assert_eq!(ext("/v1.2/readme"), None);
        assert_eq!(ext("/.htaccess"), None);
        assert_eq!(ext("/docs/"), None);
    }

    #[test]
    fn test_encoded() {
        let path = AssetPath::parse("/a%20b/caf%C3%A9").unwrap();
        assert_eq!(path.encoded(), "/a%20b/caf%C3%A9");
        assert_eq!(AssetPath::parse("/plain/").unwrap().encoded(), "/plain/");
    }
}
