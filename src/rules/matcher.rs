//! Rule matching module
//!
//! Evaluates compiled rules against a request path in declaration order.
//! Every matching rule is returned, not just the first one.

use super::pattern::{Pattern, Replacements};
use crate::error::ConfigurationError;

/// One rule that matched a request, with its captured placeholders
#[derive(Debug, Clone)]
pub struct RuleMatch<'a, T> {
    pub rule: &'a T,
    pub pattern: &'a str,
    pub replacements: Replacements,
}

impl<T> RuleMatch<'_, T> {
    /// Substitute this match's placeholders into a template
    pub fn substitute(&self, template: &str) -> String {
        self.replacements.substitute(template)
    }
}

#[derive(Debug, Clone)]
struct CompiledRule<T> {
    pattern: Pattern,
    rule: T,
}

/// Ordered, immutable set of compiled rules
#[derive(Debug, Clone)]
pub struct RulesMatcher<T> {
    rules: Vec<CompiledRule<T>>,
}

impl<T> Default for RulesMatcher<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> RulesMatcher<T> {
    /// A matcher that never matches
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Compile `(pattern, rule)` pairs, keeping their order
    ///
    /// The first malformed pattern aborts compilation.
    pub fn compile<I, P>(rules: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (P, T)>,
        P: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|(pattern, rule)| {
                Ok(CompiledRule {
                    pattern: Pattern::compile(pattern.as_ref())?,
                    rule,
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        Ok(Self { rules })
    }

    /// All rules matching `path`, in declaration order
    ///
    /// Host-qualified rules are skipped since no host is known.
    pub fn matches(&self, path: &str) -> Vec<RuleMatch<'_, T>> {
        self.matches_request(None, path)
    }

    /// All rules matching the request host and path, in declaration order
    pub fn matches_request(&self, host: Option<&str>, path: &str) -> Vec<RuleMatch<'_, T>> {
        self.rules
            .iter()
            .filter_map(|compiled| Self::evaluate(compiled, host, path))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn evaluate<'a>(
        compiled: &'a CompiledRule<T>,
        host: Option<&str>,
        path: &str,
    ) -> Option<RuleMatch<'a, T>> {
        compiled
            .pattern
            .captures(host, path)
            .map(|replacements| RuleMatch {
                rule: &compiled.rule,
                pattern: compiled.pattern.as_str(),
                replacements,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn matcher(patterns: &[&str]) -> RulesMatcher<usize> {
        RulesMatcher::compile(patterns.iter().enumerate().map(|(i, p)| (*p, i))).unwrap()
    }

    fn matched_ids(m: &RulesMatcher<usize>, path: &str) -> Vec<usize> {
        m.matches(path).iter().map(|r| *r.rule).collect()
    }

    #[test]
    fn test_all_matches_in_declaration_order() {
        let m = matcher(&["/*", "/api/*", "/web/*", "/api/:version/users"]);
        assert_eq!(matched_ids(&m, "/api/v1/users"), vec![0, 1, 3]);
        assert_eq!(matched_ids(&m, "/web/index.html"), vec![0, 2]);
    }

    #[test]
    fn test_no_match() {
        let m = matcher(&["/api/*"]);
        assert!(m.matches("/about").is_empty());
        assert!(RulesMatcher::<usize>::empty().matches("/api/x").is_empty());
    }

    #[test]
    fn test_match_carries_replacements() {
        let m = matcher(&["/users/:id/*"]);
        let found = m.matches("/users/42/avatar.png");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pattern, "/users/:id/*");
        assert_eq!(found[0].substitute("id=:id file=:splat"), "id=42 file=avatar.png");
    }

    #[test]
    fn test_host_rules_need_a_host() {
        let m = matcher(&["https://example.com/*", "/*"]);
        assert_eq!(matched_ids(&m, "/x"), vec![1]);
        let with_host: Vec<usize> = m
            .matches_request(Some("example.com"), "/x")
            .iter()
            .map(|r| *r.rule)
            .collect();
        assert_eq!(with_host, vec![0, 1]);
    }

    #[test]
    fn test_compile_surfaces_malformed_pattern() {
        let result = RulesMatcher::compile([("/ok", 0), ("not-a-path", 1)]);
        assert!(matches!(result, Err(ConfigurationError::InvalidPattern { .. })));
    }

    proptest! {
        #[test]
        fn prop_matches_are_ordered_and_pure(path in "/[a-z]{0,3}(/[a-z]{0,3}){0,3}") {
            let m = matcher(&["/*", "/a/*", "/:x", "/a/:y/*", "/b", "/:x/:y"]);
            let first = matched_ids(&m, &path);
            let second = matched_ids(&m, &path);
            prop_assert_eq!(&first, &second);
            prop_assert!(first.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
