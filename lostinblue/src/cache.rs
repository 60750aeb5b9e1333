//! Write-once, in-memory file contents.
//!
//! Each [`FileData`] owns a single `OnceLock<String>` slot. The slot is filled at
//! most once, during the single-threaded precache phase, and is never
//! invalidated or evicted: a file's content, once loaded, is taken as correct for
//! the lifetime of the process. During a query every worker reads the slot
//! through a shared reference, so no lock is ever taken.

use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, trace, warn};

use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;
use crate::results::FileError;

/// Files at or above this size are memory-mapped instead of read into a buffer
pub const MMAP_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

/// A discovered file and its cached contents
#[derive(Debug, Default)]
pub struct FileData {
    path: PathBuf,
    contents: OnceLock<String>,
}

impl FileData {
    /// Creates an entry with an empty cache slot
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contents: OnceLock::new(),
        }
    }

    /// Creates an entry whose contents are already known
    pub fn with_contents(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let file = Self::new(path);
        let _ = file.contents.set(contents.into());
        file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_cached(&self) -> bool {
        self.contents.get().is_some()
    }

    /// The cached contents, if loaded
    pub fn cached(&self) -> Option<&str> {
        self.contents.get().map(String::as_str)
    }
}

/// Loads file contents into [`FileData`] slots
#[derive(Debug, Clone, Default)]
pub struct ContentCache {
    encoding_mode: EncodingMode,
    metrics: SearchMetrics,
}

impl ContentCache {
    pub fn new(encoding_mode: EncodingMode, metrics: SearchMetrics) -> Self {
        Self {
            encoding_mode,
            metrics,
        }
    }

    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    /// Returns the contents of `file`, from the cache if loaded, otherwise from disk.
    ///
    /// * `populate_if_missing` stores freshly read contents in the cache
    /// * `halt_on_miss` turns a miss into [`SearchError::CacheMiss`]; workers set it
    ///   because every file must have been precached before the pool starts
    pub fn get_contents<'a>(
        &self,
        file: &'a FileData,
        populate_if_missing: bool,
        halt_on_miss: bool,
    ) -> SearchResult<Cow<'a, str>> {
        if let Some(contents) = file.cached() {
            self.metrics.record_cache_operation(0, true);
            return Ok(Cow::Borrowed(contents));
        }

        if halt_on_miss {
            return Err(SearchError::cache_miss(file.path()));
        }

        let text = read_contents(file.path(), self.encoding_mode, &self.metrics)?;
        if !populate_if_missing {
            self.metrics.record_cache_operation(0, false);
            return Ok(Cow::Owned(text));
        }

        let stored = text.len() as u64;
        let cached = file.contents.get_or_init(|| text);
        self.metrics.record_cache_operation(stored, false);
        Ok(Cow::Borrowed(cached.as_str()))
    }

    /// Loads every file into its cache slot, stopping at the first failure
    pub fn precache(&self, files: &[FileData]) -> SearchResult<()> {
        info!("Caching contents of {} files", files.len());
        for file in files {
            self.get_contents(file, true, false)?;
        }
        debug!("Cached {} bytes", self.metrics.get_stats().cached_bytes);
        Ok(())
    }

    /// Loads every file, dropping the ones that fail and recording why
    pub fn precache_skipping(&self, files: Vec<FileData>) -> (Vec<FileData>, Vec<FileError>) {
        info!("Caching contents of {} files", files.len());
        let mut loaded = Vec::with_capacity(files.len());
        let mut errors = Vec::new();

        for file in files {
            match self.get_contents(&file, true, false).map(|_| ()) {
                Ok(()) => loaded.push(file),
                Err(err) => {
                    warn!("Skipping {}: {}", file.path().display(), err);
                    errors.push(FileError {
                        path: file.path().to_path_buf(),
                        message: err.to_string(),
                    });
                }
            }
        }

        debug!(
            "Cached {} bytes, skipped {} files",
            self.metrics.get_stats().cached_bytes,
            errors.len()
        );
        (loaded, errors)
    }
}

/// Reads a file, choosing a buffered read or a memory map by size
fn read_contents(
    path: &Path,
    encoding_mode: EncodingMode,
    metrics: &SearchMetrics,
) -> SearchResult<String> {
    let mut file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
    let size = match file.metadata() {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            warn!("Failed to get metadata for {}: {}", path.display(), e);
            0
        }
    };
    metrics.record_read(size);

    if size >= MMAP_THRESHOLD {
        trace!("Memory mapping {} ({} bytes)", path.display(), size);
        // SAFETY: the snapshot assumes files are not modified while it is built
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| SearchError::from_io(path, e))?;
        return decode_bytes(&mmap, path, encoding_mode);
    }

    trace!("Reading {} ({} bytes)", path.display(), size);
    let mut bytes = Vec::with_capacity(size as usize);
    file.read_to_end(&mut bytes)
        .map_err(|e| SearchError::from_io(path, e))?;
    decode_vec(bytes, path, encoding_mode)
}

fn decode_bytes(bytes: &[u8], path: &Path, encoding_mode: EncodingMode) -> SearchResult<String> {
    match encoding_mode {
        EncodingMode::FailFast => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| SearchError::encoding_error(path, e)),
        EncodingMode::Lossy => Ok(lossy(bytes, path)),
    }
}

fn decode_vec(bytes: Vec<u8>, path: &Path, encoding_mode: EncodingMode) -> SearchResult<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => match encoding_mode {
            EncodingMode::FailFast => Err(SearchError::encoding_error(path, e.utf8_error())),
            EncodingMode::Lossy => Ok(lossy(e.as_bytes(), path)),
        },
    }
}

fn lossy(bytes: &[u8], path: &Path) -> String {
    let cow = String::from_utf8_lossy(bytes);
    // Owned means at least one invalid sequence was replaced
    if let Cow::Owned(_) = cow {
        warn!("Invalid UTF-8 replaced in file: {}", path.display());
    }
    cow.into_owned()
}
