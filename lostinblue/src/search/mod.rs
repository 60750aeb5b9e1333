/// This module implements the concurrent search pipeline.
///
/// # Pipeline
///
/// A query runs over a precached file set in three layers:
///
/// 1. **Per file** ([`processor`]): build a [`lines::LineIndex`], find up to N
///    matches with a [`matcher::PatternMatcher`], and expand each match into a
///    [`snippet::Snippet`].
///
/// 2. **Worker pool** ([`pool`]): a fixed number of threads pull files from a
///    bounded queue and push non-empty per-file results to a second bounded
///    queue. A full queue blocks its producer, which is the only backpressure.
///
/// 3. **Coordinator** ([`engine`]): compiles the query, runs the pool and folds
///    results into a [`crate::results::SearchOutput`].
///
/// ```rust,ignore
/// let output = search(corpus.files(), corpus.root(), r"fn \w+", &SearchOptions::default())?;
/// for (path, matches) in output.sorted() {
///     println!("{}: {} matches", path, matches.len());
/// }
/// ```
///
/// # Concurrency
///
/// File contents are loaded before any worker starts and never change
/// afterwards, so workers share them without locks. There is no ordering
/// between files: results arrive, and are inserted, in whatever order the
/// workers finish. A query always runs over the whole file set; the per-file
/// match cap is the only bound on work.
pub mod engine;
pub mod lines;
pub mod matcher;
pub mod pool;
pub mod processor;
pub mod snippet;

pub use engine::{search, search_with_cache, FailurePolicy, SearchOptions};
pub use lines::{LineIndex, SourceLocation};
pub use matcher::PatternMatcher;
pub use pool::WorkerPool;
pub use processor::FileProcessor;
pub use snippet::{build_snippet, Snippet};
