/// Path filtering for file discovery.
///
/// Two regular expressions drive discovery:
///
/// 1. **Include pattern**: tested against the full path of every plain file.
///    Files that don't match are skipped. With no include pattern every file is kept.
///
/// 2. **Exclude pattern**: tested against every directory before the walk descends
///    into it. A match prunes the whole subtree. It is never applied to plain files.
///
/// Directory paths are tested with a trailing `/`, so `/(node_modules|build)/`
/// prunes `repo/node_modules` itself rather than only its subdirectories.
use regex::Regex;
use std::path::Path;

use crate::errors::{SearchError, SearchResult};

/// Source file extensions searched when no include pattern is configured
pub const DEFAULT_INCLUDE_PATTERN: &str = r"\.(py|js|coffee|go|yaml|scss|css|html|c|cpp|m|h|java)$";

/// Dependency and build output directories skipped by default
pub const DEFAULT_EXCLUDE_PATTERN: &str = "/(node_modules|build|coverage)/";

/// Compiled include/exclude filters
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl PathFilter {
    /// Compiles the given patterns. A malformed pattern is a configuration error.
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> SearchResult<Self> {
        Ok(Self {
            include: include.map(|p| compile_filter("include", p)).transpose()?,
            exclude: exclude.map(|p| compile_filter("exclude", p)).transpose()?,
        })
    }

    /// Source files only, with dependency and build output directories pruned
    pub fn with_defaults() -> SearchResult<Self> {
        Self::new(Some(DEFAULT_INCLUDE_PATTERN), Some(DEFAULT_EXCLUDE_PATTERN))
    }

    /// Returns false if the walk must not descend into `dir`
    pub fn should_descend(&self, dir: &Path) -> bool {
        match &self.exclude {
            None => true,
            Some(exclude) => {
                let mut dir_str = normalize(dir);
                if !dir_str.ends_with('/') {
                    dir_str.push('/');
                }
                !exclude.is_match(&dir_str)
            }
        }
    }

    /// Returns true if a plain file at `path` belongs in the catalog
    pub fn should_include_file(&self, path: &Path) -> bool {
        match &self.include {
            None => true,
            Some(include) => include.is_match(&normalize(path)),
        }
    }
}

fn compile_filter(kind: &str, pattern: &str) -> SearchResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| SearchError::config_error(format!("invalid {} pattern: {}", kind, e)))
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
