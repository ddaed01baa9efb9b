//! Rules module
//!
//! Compiles declarative path-pattern rules (header rules, redirect rules)
//! into an immutable matcher:
//! - Exact paths, `*` splats and `:name` placeholders
//! - Optional host-qualified patterns (`https://host/path`)
//! - Placeholder substitution into rule values

mod matcher;
mod pattern;

pub use matcher::{RuleMatch, RulesMatcher};
pub use pattern::{Pattern, Replacements, SPLAT};
