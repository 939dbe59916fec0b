//! Admission filters and identifier transformation rules.
//!
//! A filter is a list of regular expressions: a value is admitted when at
//! least one of them matches. Transform rules are ordered
//! pattern-to-replacement rewrites applied to the target identifier before
//! it is filtered and hashed.

use regex_lite::Regex;

/// `true` when at least one pattern matches `value`.
///
/// An empty pattern list never matches. Whether an absent filter admits
/// everything is the caller's decision -- the generator skips the check
/// entirely when no filter is configured.
pub fn some_match(value: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|pattern| pattern.is_match(value))
}

/// One compiled rewrite rule.
#[derive(Debug, Clone)]
pub struct TransformRule {
    pub pattern: Regex,
    pub replacement: String,
}

impl TransformRule {
    /// Apply this rule, replacing every match.
    pub fn apply(&self, value: &str) -> String {
        self.pattern
            .replace_all(value, self.replacement.as_str())
            .into_owned()
    }
}

/// Apply ordered rewrite rules; each rule sees the previous rule's output.
pub fn apply_transforms(value: &str, rules: &[TransformRule]) -> String {
    rules
        .iter()
        .fold(value.to_string(), |current, rule| rule.apply(&current))
}
