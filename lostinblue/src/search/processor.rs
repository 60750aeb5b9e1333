use tracing::trace;

use super::lines::LineIndex;
use super::matcher::PatternMatcher;
use super::snippet::build_snippet;
use crate::cache::{ContentCache, FileData};
use crate::errors::SearchResult;
use crate::results::{FileResult, MatchResult};

/// Runs one query against one file: line index, matches, snippets
#[derive(Debug, Clone)]
pub struct FileProcessor {
    matcher: PatternMatcher,
    cache: ContentCache,
    context_before: usize,
    context_after: usize,
}

impl FileProcessor {
    pub fn new(
        matcher: PatternMatcher,
        cache: ContentCache,
        context_before: usize,
        context_after: usize,
    ) -> Self {
        Self {
            matcher,
            cache,
            context_before,
            context_after,
        }
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    /// Searches a precached file. A file that was never cached is an error.
    pub fn process_file(&self, file: &FileData) -> SearchResult<FileResult> {
        trace!("Processing file: {}", file.path().display());

        let contents = self.cache.get_contents(file, false, true)?;
        let ranges = self.matcher.find_matches(&contents);
        self.cache.metrics().record_file_processed(ranges.len());

        if ranges.is_empty() {
            return Ok(FileResult {
                path: file.path().to_path_buf(),
                matches: Vec::new(),
            });
        }

        let index = LineIndex::build(&contents);
        let matches = ranges
            .into_iter()
            .map(|range| MatchResult {
                start: index.locate(range.0),
                end: index.locate(range.1),
                snippet: build_snippet(
                    &contents,
                    &index,
                    range,
                    self.context_before,
                    self.context_after,
                ),
            })
            .collect();

        Ok(FileResult {
            path: file.path().to_path_buf(),
            matches,
        })
    }
}
