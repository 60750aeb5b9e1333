use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::trace;

use crate::errors::{SearchError, SearchResult};

/// Matches kept per file unless configured otherwise
pub const DEFAULT_MAX_MATCHES_PER_FILE: usize = 10;

/// Compiled queries, shared across searches so a repeated query is compiled once
static PATTERN_CACHE: Lazy<DashMap<String, Arc<Regex>>> = Lazy::new(DashMap::new);

/// Finds up to `max_matches` regex matches in a file's contents
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Arc<Regex>,
    max_matches: usize,
}

impl PatternMatcher {
    /// Compiles `pattern`. An invalid pattern is reported before any file is touched.
    pub fn new(pattern: &str, max_matches: usize) -> SearchResult<Self> {
        let regex = match PATTERN_CACHE.get(pattern) {
            Some(entry) => {
                trace!("Pattern cache hit for '{}'", pattern);
                Arc::clone(entry.value())
            }
            None => {
                let regex = Arc::new(
                    Regex::new(pattern).map_err(|e| SearchError::invalid_pattern(e.to_string()))?,
                );
                PATTERN_CACHE.insert(pattern.to_string(), Arc::clone(&regex));
                regex
            }
        };

        Ok(Self { regex, max_matches })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn max_matches(&self) -> usize {
        self.max_matches
    }

    /// Returns `[start, end)` byte ranges of non-overlapping matches in scan order.
    /// Matches past the cap are dropped without any indication.
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        self.regex
            .find_iter(text)
            .take(self.max_matches)
            .map(|m| (m.start(), m.end()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_matching() {
        let matcher = PatternMatcher::new("test", 10).unwrap();
        let text = "this is a test string with test pattern";
        let matches = matcher.find_matches(text);
        assert_eq!(matches.len(), 2);

        // Verify the exact positions by checking the matched text
        assert_eq!(&text[matches[0].0..matches[0].1], "test");
        assert_eq!(&text[matches[1].0..matches[1].1], "test");
        assert!(matches[0].0 < matches[1].0);
    }

    #[test]
    fn test_regex_matching() {
        let matcher = PatternMatcher::new(r"\btest\w+", 10).unwrap();
        let matches = matcher.find_matches("testing tests tested");
        assert_eq!(matches, vec![(0, 7), (8, 13), (14, 20)]);
    }

    #[test]
    fn test_cap_truncates_silently() {
        let matcher = PatternMatcher::new("x", 10).unwrap();
        let text = "x".repeat(25);
        let matches = matcher.find_matches(&text);
        assert_eq!(matches.len(), 10);
        assert_eq!(matches[9], (9, 10));

        let unlimited = PatternMatcher::new("x", usize::MAX).unwrap();
        assert_eq!(unlimited.find_matches(&text).len(), 25);
    }

    #[test]
    fn test_matches_do_not_overlap() {
        let matcher = PatternMatcher::new("aa", 10).unwrap();
        assert_eq!(matcher.find_matches("aaaaa"), vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn test_multiline_match() {
        let matcher = PatternMatcher::new(r"beta\ngamma", 10).unwrap();
        assert_eq!(matcher.find_matches("alpha beta\ngamma"), vec![(6, 16)]);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PatternMatcher::new("(", 10).unwrap_err();
        assert!(matches!(err, SearchError::InvalidPattern(_)));
    }

    #[test]
    fn test_compiled_pattern_is_shared() {
        let first = PatternMatcher::new(r"shared_\d+", 5).unwrap();
        let second = PatternMatcher::new(r"shared_\d+", 7).unwrap();
        assert!(Arc::ptr_eq(&first.regex, &second.regex));
        assert_eq!(second.max_matches(), 7);
        assert_eq!(first.pattern(), r"shared_\d+");
    }
}
