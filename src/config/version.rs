// Version management module
// Schema versions for rule sections and generation tracking for snapshots

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ConfigurationError;

/// Header rules are only honored at this schema version
pub const HEADERS_VERSION: u32 = 2;

/// Redirect rules are only honored at this schema version
pub const REDIRECTS_VERSION: u32 = 1;

/// Declared `version` of a rule section
///
/// Anything that is not an integer is kept as written so that settings still
/// load; the section then fails `check_version` and serves no rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SchemaVersion {
    Number(i64),
    Malformed(serde_json::Value),
}

impl From<u32> for SchemaVersion {
    fn from(version: u32) -> Self {
        Self::Number(i64::from(version))
    }
}

impl PartialEq<u32> for SchemaVersion {
    fn eq(&self, other: &u32) -> bool {
        matches!(self, Self::Number(n) if *n == i64::from(*other))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Malformed(value) => write!(f, "{value}"),
        }
    }
}

/// Check a section's declared schema version
pub fn check_version(
    section: &'static str,
    found: &SchemaVersion,
    expected: u32,
) -> Result<(), ConfigurationError> {
    if *found == expected {
        Ok(())
    } else {
        Err(ConfigurationError::UnsupportedVersion {
            section,
            found: found.to_string(),
            expected,
        })
    }
}

/// Snapshot generation counter
///
/// Every reload bumps the generation and records when it happened.
#[derive(Debug)]
pub struct Generation {
    current: AtomicU64,
    loaded_at_ms: AtomicU64,
}

impl Generation {
    pub fn new() -> Self {
        Self {
            current: AtomicU64::new(1),
            loaded_at_ms: AtomicU64::new(now_ms()),
        }
    }

    /// Advance to the next generation, returning it
    pub fn increment(&self) -> u64 {
        self.loaded_at_ms.store(now_ms(), Ordering::SeqCst);
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current generation and its load time (milliseconds since epoch)
    pub fn get(&self) -> (u64, u64) {
        (
            self.current.load(Ordering::SeqCst),
            self.loaded_at_ms.load(Ordering::SeqCst),
        )
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    u64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_version() {
        assert!(check_version("headers", &HEADERS_VERSION.into(), HEADERS_VERSION).is_ok());
        assert!(matches!(
            check_version("headers", &SchemaVersion::Number(1), HEADERS_VERSION),
            Err(ConfigurationError::UnsupportedVersion { found, expected: 2, .. }) if found == "1"
        ));
    }

    #[test]
    fn test_malformed_version_fails_check() {
        let malformed = [
            SchemaVersion::Number(-1),
            SchemaVersion::Malformed(serde_json::json!("two")),
            SchemaVersion::Malformed(serde_json::json!(2.5)),
        ];
        for version in malformed {
            assert!(matches!(
                check_version("redirects", &version, REDIRECTS_VERSION),
                Err(ConfigurationError::UnsupportedVersion { section: "redirects", .. })
            ));
        }
        assert_eq!(
            SchemaVersion::Malformed(serde_json::json!("two")).to_string(),
            "\"two\""
        );
    }

    #[test]
    fn test_generation_increment() {
        let generation = Generation::new();
        assert_eq!(generation.get().0, 1);
        assert_eq!(generation.increment(), 2);
        assert_eq!(generation.increment(), 3);
        assert_eq!(generation.get().0, 3);
        assert!(generation.get().1 > 0);
    }
}
