//! Rule pattern compilation
//!
//! Translates rule patterns into anchored regular expressions:
//! - `/about` matches exactly `/about`
//! - `/assets/*` captures everything after `/assets/` as `splat`
//! - `/blog/:slug` captures one path segment as `slug`
//! - `https://:sub.example.com/*` also matches on the request host

use regex::Regex;
use std::borrow::Cow;
use std::fmt::Write;

use crate::error::ConfigurationError;

const CROSS_HOST_PREFIX: &str = "https://";

/// Capture name used for `*`
pub const SPLAT: &str = "splat";

/// Placeholders in the host stop at dots as well as slashes
const HOST_PLACEHOLDER: &str = "[^/.]+";
const PATH_PLACEHOLDER: &str = "[^/]+";

/// A compiled rule pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    cross_host: bool,
    regex: Regex,
    placeholders: Vec<String>,
}

impl Pattern {
    /// Compile a pattern, rejecting anything that would silently never match
    pub fn compile(pattern: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let (cross_host, host, path) = if let Some(rest) = pattern.strip_prefix(CROSS_HOST_PREFIX) {
            let Some(slash) = rest.find('/') else {
                return Err(invalid("host-qualified pattern needs a path after the host"));
            };
            let (host, path) = rest.split_at(slash);
            if host.is_empty() {
                return Err(invalid("host-qualified pattern has an empty host"));
            }
            (true, host, path)
        } else if pattern.starts_with('/') {
            (false, "", pattern)
        } else {
            return Err(invalid("pattern must start with '/' or 'https://'"));
        };

        let mut placeholders = Vec::new();
        let mut source = String::from("^");
        if cross_host {
            source.push_str(&regex::escape(CROSS_HOST_PREFIX));
            translate(pattern, host, HOST_PLACEHOLDER, &mut source, &mut placeholders)?;
        }
        translate(pattern, path, PATH_PLACEHOLDER, &mut source, &mut placeholders)?;
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            source: pattern.to_string(),
            cross_host,
            regex,
            placeholders,
        })
    }

    /// The pattern as written in configuration
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match a request, returning the captured placeholder values
    ///
    /// Host-qualified patterns never match when the host is unknown.
    pub fn captures(&self, host: Option<&str>, path: &str) -> Option<Replacements> {
        let subject: Cow<'_, str> = if self.cross_host {
            let host = normalize_host(host?);
            Cow::Owned(format!("{CROSS_HOST_PREFIX}{host}{path}"))
        } else {
            Cow::Borrowed(path)
        };

        let caps = self.regex.captures(&subject)?;
        let values = self
            .placeholders
            .iter()
            .map(|name| {
                let value = caps
                    .name(name)
                    .map_or_else(String::new, |m| m.as_str().to_string());
                (name.clone(), value)
            })
            .collect();

        Some(Replacements { values })
    }
}

/// Captured placeholder values of one match, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacements {
    values: Vec<(String, String)>,
}

impl Replacements {
    /// Value captured for `name`, if the pattern declares it
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Substitute `:name` tokens in `template`
    ///
    /// Tokens are scanned with maximal munch, so `:pathname` is never
    /// mistaken for `:path`. Tokens the pattern does not declare stay as written.
    pub fn substitute(&self, template: &str) -> String {
        if self.values.is_empty() || !template.contains(':') {
            return template.to_string();
        }

        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(colon) = rest.find(':') {
            out.push_str(&rest[..colon]);
            let after = &rest[colon + 1..];
            let name_len = after
                .find(|c: char| !is_word_char(c))
                .unwrap_or(after.len());
            let name = &after[..name_len];

            match self.get(name) {
                Some(value) if !name.is_empty() => out.push_str(value),
                _ => {
                    out.push(':');
                    out.push_str(name);
                }
            }
            rest = &after[name_len..];
        }
        out.push_str(rest);
        out
    }
}

/// Append the regex translation of one pattern part to `out`
fn translate(
    pattern: &str,
    part: &str,
    placeholder_class: &str,
    out: &mut String,
    names: &mut Vec<String>,
) -> Result<(), ConfigurationError> {
    let mut chars = part.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                declare(pattern, SPLAT, names)?;
                let _ = write!(out, "(?P<{SPLAT}>.*)");
            }
            ':' => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if !is_word_char(next) {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }

                if name.is_empty() {
                    out.push(':');
                } else {
                    declare(pattern, &name, names)?;
                    let _ = write!(out, "(?P<{name}>{placeholder_class})");
                }
            }
            other => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
    }
    Ok(())
}

fn declare(pattern: &str, name: &str, names: &mut Vec<String>) -> Result<(), ConfigurationError> {
    if names.iter().any(|n| n == name) {
        return Err(ConfigurationError::DuplicatePlaceholder {
            pattern: pattern.to_string(),
            name: name.to_string(),
        });
    }
    names.push(name.to_string());
    Ok(())
}

const fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Lowercase the host and strip any port
fn normalize_host(host: &str) -> String {
    host.split(':').next().unwrap_or(host).to_ascii_lowercase()
}
