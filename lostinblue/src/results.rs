/// Search result types.
///
/// A query produces one [`FileResult`] per file with at least one match. The
/// coordinator folds those into a [`SearchOutput`], keyed by the file path with
/// the corpus root stripped.
///
/// # Ordering
///
/// Results arrive from the workers in no particular order and are stored in a
/// `HashMap`. Nothing inside the engine sorts them. Callers that need a
/// deterministic order ask for it at the serialization boundary:
/// ```rust,ignore
/// let json = output.to_json(true)?;       // keys sorted by path
/// for (path, matches) in output.sorted() { /* ... */ }
/// ```
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use crate::errors::SearchResult;
use crate::search::lines::SourceLocation;
use crate::search::snippet::Snippet;

/// A single match in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Where the match starts
    pub start: SourceLocation,
    /// Where the match ends (exclusive)
    pub end: SourceLocation,
    /// Surrounding lines
    pub snippet: Snippet,
}

/// All matches kept for a single file
#[derive(Debug, Clone)]
pub struct FileResult {
    /// The full path of the file
    pub path: PathBuf,
    /// Matches in scan order, at most the per-file cap
    pub matches: Vec<MatchResult>,
}

/// A file that could not be searched, recorded when errors are skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The aggregated results of one query
#[derive(Debug, Clone, Default)]
pub struct SearchOutput {
    /// Matches per file, keyed by root-relative path
    pub files: HashMap<String, Vec<MatchResult>>,
    /// Files that failed and were skipped
    pub errors: Vec<FileError>,
    /// Number of files in the searched set
    pub files_searched: usize,
}

impl SearchOutput {
    /// Creates a new empty search output
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds the matches for one file under `key`
    pub fn insert(&mut self, key: String, matches: Vec<MatchResult>) {
        self.files.insert(key, matches);
    }

    /// Total number of matches across all files
    pub fn total_matches(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Number of files with at least one match
    pub fn files_with_matches(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Matches keyed by path, in path order
    pub fn sorted(&self) -> BTreeMap<&str, &[MatchResult]> {
        self.files
            .iter()
            .map(|(path, matches)| (path.as_str(), matches.as_slice()))
            .collect()
    }

    /// Serializes the `path -> matches` mapping with keys in path order
    pub fn to_json(&self, pretty: bool) -> SearchResult<String> {
        let sorted = self.sorted();
        let json = if pretty {
            serde_json::to_string_pretty(&sorted)?
        } else {
            serde_json::to_string(&sorted)?
        };
        Ok(json)
    }
}
