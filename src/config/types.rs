// Configuration types module
// Defines all configuration-related data structures

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::version::{SchemaVersion, HEADERS_VERSION, REDIRECTS_VERSION};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub assets: AssetSettings,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Per-connection timeout in seconds
    pub read_timeout: u64,
    pub max_connections: Option<u64>,
}

/// Asset serving configuration, as declared by the user
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory the asset index is built from
    pub directory: String,
    pub html_handling: HtmlHandling,
    pub not_found_handling: NotFoundHandling,
    /// Whether this server answers requests directly (rather than behind
    /// another worker that handles unmatched methods)
    pub serve_directly: bool,
    pub headers: HeadersConfig,
    pub redirects: RedirectsConfig,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            directory: "public".to_string(),
            html_handling: HtmlHandling::default(),
            not_found_handling: NotFoundHandling::default(),
            serve_directly: true,
            headers: HeadersConfig::default(),
            redirects: RedirectsConfig::default(),
        }
    }
}

/// How `.html` extensions and trailing slashes are treated
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HtmlHandling {
    #[default]
    AutoTrailingSlash,
    ForceTrailingSlash,
    DropTrailingSlash,
    None,
}

/// What to serve when nothing matched
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NotFoundHandling {
    SinglePageApplication,
    #[serde(rename = "404-page")]
    NotFoundPage,
    #[default]
    None,
}

/// Versioned list of header rules
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HeadersConfig {
    pub version: SchemaVersion,
    pub rules: Vec<HeaderRule>,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            version: HEADERS_VERSION.into(),
            rules: Vec::new(),
        }
    }
}

/// Header rule: headers to set and unset for requests matching `path`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct HeaderRule {
    pub path: String,
    /// Written as a table, applied in declaration order
    #[serde(
        default,
        deserialize_with = "ordered_pairs::deserialize",
        serialize_with = "ordered_pairs::serialize"
    )]
    pub set: Vec<(String, String)>,
    #[serde(default)]
    pub unset: Vec<String>,
}

/// A string table kept as a list of pairs in the order it was written
mod ordered_pairs {
    use super::{fmt, Deserializer, MapAccess, Serializer, Visitor};

    struct PairsVisitor;

    impl<'de> Visitor<'de> for PairsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a table of header names to values")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(pair) = map.next_entry()? {
                pairs.push(pair);
            }
            Ok(pairs)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, String)>, D::Error> {
        deserializer.deserialize_map(PairsVisitor)
    }

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(pairs: &Vec<(String, String)>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(pairs.iter().map(|(name, value)| (name, value)))
    }
}

/// Versioned list of static redirect rules
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RedirectsConfig {
    pub version: SchemaVersion,
    pub rules: Vec<RedirectRule>,
}

impl Default for RedirectsConfig {
    fn default() -> Self {
        Self {
            version: REDIRECTS_VERSION.into(),
            rules: Vec::new(),
        }
    }
}

/// Redirect rule: requests matching `from` are sent to `to`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    pub from: String,
    pub to: String,
    #[serde(default = "default_redirect_status")]
    pub status: u16,
}

#[allow(clippy::missing_const_for_fn)]
fn default_redirect_status() -> u16 {
    302
}
