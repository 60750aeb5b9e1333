/// This module defines the error types for lostinblue.
///
/// # Error Classes
///
/// Errors fall into three groups, distinguished by when they can happen:
///
/// 1. **Configuration errors** (`InvalidPattern`, `ConfigError`)
///    Raised before any work starts. A malformed query never launches a worker.
///
/// 2. **Input errors** (`IoError`, `FileNotFound`, `PermissionDenied`, `WalkError`, `EncodingError`)
///    Raised while discovering or loading files. During startup they abort the
///    whole operation; during a query they are per-file values that the
///    coordinator either returns or records, depending on the failure policy.
///
/// 3. **Invariant violations** (`CacheMiss`, `WorkerPanicked`)
///    A worker found a file that was never precached, or a worker unwound.
///    These point at a bug rather than bad data and are always fatal.
///
/// ```rust,ignore
/// match corpus.search("fn main", &options) {
///     Ok(output) => println!("{}", output.to_json(false)?),
///     Err(SearchError::InvalidPattern(msg)) => eprintln!("bad query: {}", msg),
///     Err(e) => eprintln!("search failed: {}", e),
/// }
/// ```
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during discovery, caching and search
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Content of {0} was not precached")]
    CacheMiss(PathBuf),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    WalkError(#[from] ignore::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid UTF-8 in file {path}: {source}")]
    EncodingError {
        path: PathBuf,
        source: std::str::Utf8Error,
    },
    #[error("Search worker {0} panicked")]
    WorkerPanicked(usize),
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn cache_miss(path: impl Into<PathBuf>) -> Self {
        Self::CacheMiss(path.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn encoding_error(path: impl Into<PathBuf>, source: std::str::Utf8Error) -> Self {
        Self::EncodingError {
            path: path.into(),
            source,
        }
    }

    /// Maps an IO error on `path` to the most specific variant
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }

    /// Whether this error points at a defect rather than at the data being searched.
    /// Such errors are fatal regardless of the failure policy.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::CacheMiss(_) | Self::WorkerPanicked(_))
    }
}
