use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{debug, info, warn};

use super::matcher::{PatternMatcher, DEFAULT_MAX_MATCHES_PER_FILE};
use super::pool::WorkerPool;
use super::processor::FileProcessor;
use super::snippet::DEFAULT_CONTEXT_LINES;
use crate::cache::{ContentCache, FileData};
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::results::{FileError, SearchOutput};

/// What to do when a file cannot be loaded or searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Return the first error once the pool has drained
    #[default]
    Abort,
    /// Record the failure in [`SearchOutput::errors`] and keep the other results.
    ///
    /// Workers only read precached contents, so unreadable files are dropped
    /// while loading and reported through `Corpus::load_errors`; a query itself
    /// can only fail with invariant violations, which are never skipped.
    Skip,
}

/// Per-query settings
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub worker_count: NonZeroUsize,
    pub buffering: NonZeroUsize,
    pub max_matches_per_file: usize,
    pub context_before: usize,
    pub context_after: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            worker_count: NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN),
            buffering: NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN),
            max_matches_per_file: DEFAULT_MAX_MATCHES_PER_FILE,
            context_before: DEFAULT_CONTEXT_LINES,
            context_after: DEFAULT_CONTEXT_LINES,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            worker_count: config.thread_count,
            buffering: config.buffering,
            max_matches_per_file: config.max_matches_per_file,
            context_before: config.context_before,
            context_after: config.context_after,
            failure_policy: if config.skip_errors {
                FailurePolicy::Skip
            } else {
                FailurePolicy::Abort
            },
        }
    }
}

/// Runs `query` over `files` and collects every file with at least one match.
///
/// Every file must already be precached. Result keys are the file paths with
/// `root_prefix` stripped. An invalid query fails before any thread starts.
pub fn search(
    files: &[FileData],
    root_prefix: &Path,
    query: &str,
    options: &SearchOptions,
) -> SearchResult<SearchOutput> {
    search_with_cache(files, root_prefix, query, options, &ContentCache::default())
}

/// Like [`search`], reading contents through an existing cache so its metrics
/// accumulate across queries
pub fn search_with_cache(
    files: &[FileData],
    root_prefix: &Path,
    query: &str,
    options: &SearchOptions,
    cache: &ContentCache,
) -> SearchResult<SearchOutput> {
    info!("Searching {} files for '{}'", files.len(), query);

    let matcher = PatternMatcher::new(query, options.max_matches_per_file)?;
    let processor = FileProcessor::new(
        matcher,
        cache.clone(),
        options.context_before,
        options.context_after,
    );
    let pool = WorkerPool::new(options.worker_count, options.buffering);

    let mut output = SearchOutput::new();
    output.files_searched = files.len();
    let mut first_error: Option<SearchError> = None;

    pool.run(files, &processor, |outcome| match outcome {
        Ok(file_result) => {
            let key = relative_key(&file_result.path, root_prefix);
            output.insert(key, file_result.matches);
        }
        Err(err) => {
            // Only reachable for errors raised by the processor besides cache misses
            if options.failure_policy == FailurePolicy::Skip && !err.is_invariant_violation() {
                warn!("Skipping file: {}", err);
                output.errors.push(FileError {
                    path: error_path(&err).unwrap_or_default(),
                    message: err.to_string(),
                });
            } else if first_error.is_none() {
                first_error = Some(err);
            }
        }
    })?;

    if let Some(err) = first_error {
        return Err(err);
    }

    debug!(
        "Found {} matches in {} files ({} skipped)",
        output.total_matches(),
        output.files_with_matches(),
        output.errors.len()
    );
    Ok(output)
}

/// The mapping key for `path`: `root_prefix` stripped, `/` separators
pub fn relative_key(path: &Path, root_prefix: &Path) -> String {
    let relative = path.strip_prefix(root_prefix).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

fn error_path(err: &SearchError) -> Option<std::path::PathBuf> {
    match err {
        SearchError::FileNotFound(path)
        | SearchError::PermissionDenied(path)
        | SearchError::CacheMiss(path)
        | SearchError::EncodingError { path, .. } => Some(path.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::lines::SourceLocation;
    use std::path::PathBuf;

    fn options(workers: usize) -> SearchOptions {
        SearchOptions {
            worker_count: NonZeroUsize::new(workers).unwrap(),
            buffering: NonZeroUsize::new(2).unwrap(),
            ..SearchOptions::default()
        }
    }

    #[test]
    fn test_alpha_example() {
        let files = vec![FileData::with_contents(
            "/srv/repo/notes.txt",
            "alpha\nbeta gamma\nalpha\n",
        )];
        let output = search(&files, Path::new("/srv/repo"), "alpha", &options(2)).unwrap();

        let matches = &output.files["notes.txt"];
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].start, SourceLocation { line: 0, column: 0 });
        assert_eq!(matches[0].end, SourceLocation { line: 0, column: 5 });
        assert_eq!(matches[1].start, SourceLocation { line: 2, column: 0 });
        assert_eq!(matches[1].end, SourceLocation { line: 2, column: 5 });
    }

    #[test]
    fn test_invalid_query_fails_before_search() {
        // Uncached: a worker touching this file would report a cache miss instead
        let files = vec![FileData::new("/srv/repo/a.go")];
        let err = search(&files, Path::new("/srv/repo"), "(", &options(4)).unwrap_err();
        assert!(matches!(err, SearchError::InvalidPattern(_)));
    }

    #[test]
    fn test_files_without_matches_are_omitted() {
        let files = vec![
            FileData::with_contents("/r/hit.go", "needle"),
            FileData::with_contents("/r/miss.go", "haystack"),
        ];
        let output = search(&files, Path::new("/r"), "needle", &options(2)).unwrap();
        assert_eq!(output.files.len(), 1);
        assert!(output.files.contains_key("hit.go"));
        assert_eq!(output.files_searched, 2);
    }

    #[test]
    fn test_cache_miss_is_fatal_even_when_skipping() {
        let files = vec![
            FileData::with_contents("/r/a.go", "needle"),
            FileData::new("/r/never_cached.go"),
        ];
        let opts = SearchOptions {
            failure_policy: FailurePolicy::Skip,
            ..options(2)
        };
        let err = search(&files, Path::new("/r"), "needle", &opts).unwrap_err();
        assert!(matches!(err, SearchError::CacheMiss(_)));
    }

    #[test]
    fn test_relative_key() {
        assert_eq!(
            relative_key(Path::new("/srv/repo/src/main.go"), Path::new("/srv/repo")),
            "src/main.go"
        );
        assert_eq!(
            relative_key(Path::new("./src/main.go"), Path::new(".")),
            "src/main.go"
        );
        assert_eq!(
            relative_key(Path::new("/elsewhere/x.c"), Path::new("/srv/repo")),
            "/elsewhere/x.c"
        );
        assert_eq!(
            relative_key(&PathBuf::from("repo/a.js"), Path::new("")),
            "repo/a.js"
        );
    }

    #[test]
    fn test_options_from_config() {
        let config = SearchConfig {
            thread_count: NonZeroUsize::new(3).unwrap(),
            max_matches_per_file: 4,
            context_before: 1,
            context_after: 0,
            skip_errors: true,
            ..SearchConfig::default()
        };
        let opts = SearchOptions::from(&config);
        assert_eq!(opts.worker_count.get(), 3);
        assert_eq!(opts.max_matches_per_file, 4);
        assert_eq!(opts.context_before, 1);
        assert_eq!(opts.context_after, 0);
        assert_eq!(opts.failure_policy, FailurePolicy::Skip);
    }
}
