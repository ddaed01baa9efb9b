//! Static redirect rules
//!
//! Evaluated before any asset lookup; the first matching rule wins.

use crate::config::{check_version, RedirectsConfig, REDIRECTS_VERSION};
use crate::error::ConfigurationError;
use crate::rules::RulesMatcher;

use super::RedirectKind;

/// Compiled target of one redirect rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectInstruction {
    /// Destination template, may contain placeholders
    pub to: String,
    pub kind: RedirectKind,
}

pub type RedirectRules = RulesMatcher<RedirectInstruction>;

/// Compile the `redirects` section, rejecting unknown versions, statuses
/// and targets that leave the site
pub fn compile_redirect_rules(config: &RedirectsConfig) -> Result<RedirectRules, ConfigurationError> {
    check_version("redirects", &config.version, REDIRECTS_VERSION)?;

    let mut compiled = Vec::with_capacity(config.rules.len());
    for rule in &config.rules {
        if !is_host_relative(&rule.to) {
            return Err(ConfigurationError::InvalidRedirectTarget {
                pattern: rule.from.clone(),
                target: rule.to.clone(),
            });
        }
        let kind = RedirectKind::from_status(rule.status).ok_or_else(|| {
            ConfigurationError::InvalidRedirectStatus {
                pattern: rule.from.clone(),
                status: rule.status,
            }
        })?;
        compiled.push((
            rule.from.as_str(),
            RedirectInstruction {
                to: rule.to.clone(),
                kind,
            },
        ));
    }

    RulesMatcher::compile(compiled)
}

/// `/path`, but not the protocol-relative `//host` or `/\host`
fn is_host_relative(target: &str) -> bool {
    target.starts_with('/') && !matches!(target.as_bytes().get(1), Some(b'/' | b'\\'))
}

/// Find the redirect for a request, with the query string re-attached
///
/// Captured values can start with slashes (`/old//evil.com`), so leading
/// slashes of the substituted target collapse to one. A rule whose
/// destination is the request path itself is skipped so a catch-all rule
/// cannot redirect to itself forever.
pub fn find_redirect(
    rules: &RedirectRules,
    host: Option<&str>,
    path: &str,
    query: Option<&str>,
) -> Option<(String, RedirectKind)> {
    rules.matches_request(host, path).into_iter().find_map(|found| {
        let substituted = found.substitute(&found.rule.to);
        let target = format!("/{}", substituted.trim_start_matches(['/', '\\']));
        if target == path {
            return None;
        }
        Some((with_query(target, query), found.rule.kind))
    })
}

/// Append `query` unless the target already carries its own
pub fn with_query(mut target: String, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() && !target.contains('?') => {
            target.push('?');
            target.push_str(query);
            target
        }
        _ => target,
    }
}
