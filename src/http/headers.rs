//! Response header composition module
//!
//! Merges server defaults (`ETag`, `Content-Type`, browser cache policy)
//! with user-declared header rules.

use hyper::header::{HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, ETAG};
use hyper::HeaderMap;
use std::collections::HashSet;
use std::str::FromStr;

use super::cache;
use crate::config::{check_version, HeadersConfig, HEADERS_VERSION};
use crate::error::ConfigurationError;
use crate::logger;
use crate::rules::{RuleMatch, RulesMatcher};

/// Compiled `set`/`unset` instructions of one header rule
#[derive(Debug, Clone)]
pub struct HeaderInstructions {
    /// Header names with value templates (may contain `:placeholders`)
    pub set: Vec<(HeaderName, String)>,
    pub unset: Vec<HeaderName>,
}

pub type HeaderRules = RulesMatcher<HeaderInstructions>;

/// Compile header rules, validating the schema version and header names
pub fn compile_header_rules(config: &HeadersConfig) -> Result<HeaderRules, ConfigurationError> {
    check_version("headers", &config.version, HEADERS_VERSION)?;

    let mut compiled = Vec::with_capacity(config.rules.len());
    for rule in &config.rules {
        let parse = |name: &str| {
            HeaderName::from_str(name).map_err(|_| ConfigurationError::InvalidHeaderName {
                pattern: rule.path.clone(),
                name: name.to_string(),
            })
        };

        let set = rule
            .set
            .iter()
            .map(|(name, value)| Ok((parse(name)?, value.clone())))
            .collect::<Result<Vec<_>, ConfigurationError>>()?;
        let unset = rule
            .unset
            .iter()
            .map(|name| parse(name))
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        compiled.push((rule.path.as_str(), HeaderInstructions { set, unset }));
    }

    RulesMatcher::compile(compiled)
}

/// Build the response header set
///
/// Order of operations:
/// 1. Seed `ETag` (quoted) and `Content-Type` over `base`
/// 2. Add the browser cache default for cacheable requests
/// 3. Apply matched rules in order: `unset` first, then `set`. The first `set`
///    of a name in this response replaces, later ones append.
/// 4. Strip `Cache-Control` again for non-cacheable requests
pub fn compose(
    base: HeaderMap,
    etag: &str,
    content_type: Option<&str>,
    cacheable: bool,
    matches: &[RuleMatch<'_, HeaderInstructions>],
) -> HeaderMap {
    let mut headers = base;

    match HeaderValue::from_str(&cache::quote_etag(etag)) {
        Ok(value) => {
            headers.insert(ETAG, value);
        }
        Err(_) => logger::log_warning(&format!("Skipping unrepresentable ETag '{etag}'")),
    }

    if let Some(content_type) = content_type {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
    }

    if cacheable {
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static(cache::CACHE_CONTROL_BROWSER),
        );
    }

    // HeaderName is already lowercase, so this set is case-insensitive
    let mut set_by_rules: HashSet<HeaderName> = HashSet::new();
    for rule_match in matches {
        let instructions = rule_match.rule;

        for name in &instructions.unset {
            headers.remove(name);
        }

        for (name, template) in &instructions.set {
            let value = rule_match.substitute(template);
            let Ok(value) = HeaderValue::from_str(&value) else {
                logger::log_warning(&format!(
                    "Rule '{}' produced an invalid value for header '{name}', skipped",
                    rule_match.pattern
                ));
                continue;
            };

            if set_by_rules.contains(name) {
                headers.append(name.clone(), value);
            } else {
                headers.insert(name.clone(), value);
                set_by_rules.insert(name.clone());
            }
        }
    }

    if !cacheable {
        headers.remove(CACHE_CONTROL);
    }

    headers
}
