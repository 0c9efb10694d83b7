//! Filter-rule evaluation — decides which destination folder, if any, a feed
//! entry maps to.
//!
//! Rules are evaluated in caller-supplied order and the first matching rule
//! wins: once a rule's pattern matches, its folder template is resolved and
//! returned immediately, even when the resolved folder is empty. Matching is
//! pure — no side effects on the rule list or the regex engine.

use crate::config::FilterRuleConfig;
use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Compiled-DFA size limit applied to configured patterns, guarding against
/// pathological regexes from configuration
const REGEX_SIZE_LIMIT: usize = 1024 * 1024;

/// A compiled filter rule: pattern, destination-folder template, and an
/// optional owning feed.
///
/// Read-only for the process lifetime once compiled.
#[derive(Clone, Debug)]
pub struct FilterRule {
    pattern: Regex,
    folder: String,
    feed_id: Option<String>,
}

impl FilterRule {
    /// Compile a rule from its configured parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the pattern is not a valid regular
    /// expression or exceeds the compiled-size limit.
    pub fn new(
        pattern: &str,
        folder: impl Into<String>,
        feed_id: Option<String>,
    ) -> Result<Self> {
        let compiled = RegexBuilder::new(pattern)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| Error::Config {
                message: format!("invalid filter pattern '{pattern}': {e}"),
                key: Some("filters.pattern".to_string()),
            })?;

        Ok(Self {
            pattern: compiled,
            folder: folder.into(),
            feed_id,
        })
    }

    /// The configured pattern, as written
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// The feed this rule is scoped to, if any
    pub fn feed_id(&self) -> Option<&str> {
        self.feed_id.as_deref()
    }

    /// A rule with no feed id matches items from all feeds; a feed-scoped
    /// rule matches only items whose feed id equals it case-insensitively.
    /// An item with an empty feed id never satisfies a feed-scoped rule.
    fn eligible_for(&self, feed_id: &str) -> bool {
        match self.feed_id.as_deref() {
            None | Some("") => true,
            Some(scope) => !feed_id.is_empty() && scope.eq_ignore_ascii_case(feed_id),
        }
    }

    /// Attempt the pattern against `text`; on a match, expand the folder
    /// template with the capture groups.
    fn resolve(&self, text: &str) -> Option<String> {
        self.pattern.captures(text).map(|caps| {
            let mut folder = String::new();
            caps.expand(&self.folder, &mut folder);
            folder
        })
    }
}

/// Compile configured rules, preserving order. Invalid patterns are logged
/// and skipped rather than failing the whole set.
pub fn compile_rules(configs: &[FilterRuleConfig]) -> Vec<FilterRule> {
    configs
        .iter()
        .filter_map(|config| {
            FilterRule::new(&config.pattern, config.folder.clone(), config.feed_id.clone())
                .map_err(|e| warn!(pattern = %config.pattern, error = %e, "skipping invalid filter rule"))
                .ok()
        })
        .collect()
}

/// Evaluate `rules` in order against `text` for an item from `feed_id`.
///
/// Returns the folder resolved by the first eligible rule whose pattern
/// matches, or `None` when no rule matches. An empty resolved folder still
/// counts as a match (`Some("")`) and stops evaluation — callers must treat
/// it distinctly from `None`, since it usually signals a broken folder
/// template rather than "ignore this entry".
pub fn match_rules(rules: &[FilterRule], text: &str, feed_id: &str) -> Option<String> {
    rules
        .iter()
        .filter(|rule| rule.eligible_for(feed_id))
        .find_map(|rule| rule.resolve(text))
}
