//! File discovery and the precached snapshot.
//!
//! [`discover`] walks a tree once, pruning excluded directories, and
//! [`Corpus`] loads every file it found before the first query runs.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::cache::{ContentCache, FileData};
use crate::config::SearchConfig;
use crate::errors::SearchResult;
use crate::filters::PathFilter;
use crate::metrics::SearchMetrics;
use crate::results::{FileError, SearchOutput};
use crate::search::engine::{search_with_cache, SearchOptions};

/// Recursively lists the files under `root` that pass `filter`.
///
/// Directories matching the exclude pattern are pruned before they are read.
/// Symbolic links are never followed or returned. The order is whatever the
/// file system yields. Any unreadable directory aborts the walk.
pub fn discover(root: &Path, filter: &PathFilter) -> SearchResult<Vec<FileData>> {
    if root.is_dir() && !filter.should_descend(root) {
        debug!("Root {} is excluded", root.display());
        return Ok(Vec::new());
    }

    let dir_filter = filter.clone();
    let mut walker = WalkBuilder::new(root);
    walker
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !is_dir || dir_filter.should_descend(entry.path())
        });

    let mut files = Vec::new();
    for entry in walker.build() {
        let entry = entry?;
        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_symlink() || !file_type.is_file() {
            continue;
        }
        if filter.should_include_file(entry.path()) {
            files.push(FileData::new(entry.into_path()));
        }
    }

    debug!("Found {} files under {}", files.len(), root.display());
    Ok(files)
}

/// A precached snapshot of a file tree.
///
/// Built once, then shared read-only by every query.
#[derive(Debug)]
pub struct Corpus {
    root: PathBuf,
    files: Vec<FileData>,
    load_errors: Vec<FileError>,
    cache: ContentCache,
}

impl Corpus {
    /// Discovers and precaches the tree described by `config`.
    ///
    /// With `skip_errors` set, unreadable files are left out and reported by
    /// [`Corpus::load_errors`]; otherwise the first one fails the load.
    pub fn load(config: &SearchConfig) -> SearchResult<Self> {
        let started = Instant::now();
        let filter = config.path_filter()?;

        info!("Building file list for {}", config.root_path.display());
        let files = discover(&config.root_path, &filter)?;

        let cache = ContentCache::new(config.encoding_mode, SearchMetrics::new());
        let (files, load_errors) = if config.skip_errors {
            cache.precache_skipping(files)
        } else {
            cache.precache(&files)?;
            (files, Vec::new())
        };

        info!(
            "Loaded {} files ({} skipped) in {:?}",
            files.len(),
            load_errors.len(),
            started.elapsed()
        );

        Ok(Self {
            root: config.root_path.clone(),
            files,
            load_errors,
            cache,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[FileData] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files left out of the snapshot because they could not be loaded
    pub fn load_errors(&self) -> &[FileError] {
        &self.load_errors
    }

    pub fn metrics(&self) -> &SearchMetrics {
        self.cache.metrics()
    }

    /// Runs `query` over the snapshot. Load errors are reported alongside the results.
    pub fn search(&self, query: &str, options: &SearchOptions) -> SearchResult<SearchOutput> {
        let mut output =
            search_with_cache(&self.files, &self.root, query, options, &self.cache)?;
        output
            .errors
            .splice(0..0, self.load_errors.iter().cloned());
        Ok(output)
    }
}
