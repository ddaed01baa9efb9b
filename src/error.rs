//! Error types
//!
//! Configuration problems degrade to "no rules" and never abort a request.
//! Path rejections are folded into a 404. Only asset store failures escalate
//! to a 500, and their messages stay in the error log.

use thiserror::Error;

/// Problems found while compiling header or redirect rules
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid rule pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("rule pattern '{pattern}' declares placeholder ':{name}' more than once")]
    DuplicatePlaceholder { pattern: String, name: String },

    #[error("rule '{pattern}' uses invalid header name '{name}'")]
    InvalidHeaderName { pattern: String, name: String },

    #[error("unsupported {section} version {found} (expected {expected}), rules ignored")]
    UnsupportedVersion {
        section: &'static str,
        found: String,
        expected: u32,
    },

    #[error("redirect rule '{pattern}' has unsupported status {status}")]
    InvalidRedirectStatus { pattern: String, status: u16 },

    #[error("redirect rule '{pattern}' targets '{target}', which is not a host-relative path")]
    InvalidRedirectTarget { pattern: String, target: String },
}

/// Reasons a request path is refused before any asset lookup
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathRejection {
    #[error("path traversal segment in '{0}'")]
    Traversal(String),

    #[error("path '{0}' is not valid percent-encoded UTF-8")]
    InvalidEncoding(String),

    #[error("path '{0}' is not absolute")]
    NotAbsolute(String),
}

/// Failures of the external asset store
#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("asset store I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("asset '{0}' is indexed but its body is missing")]
    MissingBody(String),

    #[error("failed to build asset index: {0}")]
    Index(String),
}

/// Process-level settings errors (fatal at startup, ignored on reload)
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    Address {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to load assets: {0}")]
    Assets(#[from] AssetStoreError),
}
