use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::MMAP_THRESHOLD;

/// Tracks cache usage and search throughput.
///
/// Clones share the same counters, so a single instance can be handed to
/// every worker.
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    // Cache metrics
    cached_bytes: Arc<AtomicU64>,
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,

    // Read strategy metrics
    small_reads: Arc<AtomicU64>,
    mmap_reads: Arc<AtomicU64>,

    // Search metrics
    files_processed: Arc<AtomicU64>,
    matches_found: Arc<AtomicU64>,
}

impl SearchMetrics {
    /// Creates a new SearchMetrics instance
    pub fn new() -> Self {
        Self {
            cached_bytes: Arc::new(AtomicU64::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
            small_reads: Arc::new(AtomicU64::new(0)),
            mmap_reads: Arc::new(AtomicU64::new(0)),
            files_processed: Arc::new(AtomicU64::new(0)),
            matches_found: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a content lookup; `stored` is the number of bytes newly cached
    pub fn record_cache_operation(&self, stored: u64, hit: bool) {
        if stored > 0 {
            let total = self.cached_bytes.fetch_add(stored, Ordering::Relaxed) + stored;
            debug!("Cached {} bytes, cache holds {} bytes", stored, total);
        }

        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records which strategy was used to read a file of `size` bytes
    pub fn record_read(&self, size: u64) {
        if size >= MMAP_THRESHOLD {
            self.mmap_reads.fetch_add(1, Ordering::Relaxed);
        } else {
            self.small_reads.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a processed file and the number of matches kept for it
    pub fn record_file_processed(&self, matches: usize) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
        self.matches_found
            .fetch_add(matches as u64, Ordering::Relaxed);
    }

    /// Gets current statistics
    pub fn get_stats(&self) -> MetricsStats {
        MetricsStats {
            cached_bytes: self.cached_bytes.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            small_reads: self.small_reads.load(Ordering::Relaxed),
            mmap_reads: self.mmap_reads.load(Ordering::Relaxed),
            files_processed: self.files_processed.load(Ordering::Relaxed),
            matches_found: self.matches_found.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats:\n\
             Cache size: {} bytes\n\
             Cache hits/misses: {}/{}\n\
             Files read (small/mmap): {}/{}\n\
             Files processed: {}\n\
             Matches kept: {}",
            stats.cached_bytes,
            stats.cache_hits,
            stats.cache_misses,
            stats.small_reads,
            stats.mmap_reads,
            stats.files_processed,
            stats.matches_found
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the counters in [`SearchMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsStats {
    pub cached_bytes: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub small_reads: u64,
    pub mmap_reads: u64,
    pub files_processed: u64,
    pub matches_found: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_metrics() {
        let metrics = SearchMetrics::new();

        metrics.record_cache_operation(100, false);
        let stats = metrics.get_stats();
        assert_eq!(stats.cached_bytes, 100);
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 1);

        metrics.record_cache_operation(0, true);
        metrics.record_cache_operation(0, true);
        let stats = metrics.get_stats();
        assert_eq!(stats.cached_bytes, 100);
        assert_eq!(stats.cache_hits, 2);
        assert_eq!(stats.cache_misses, 1);
    }

    #[test]
    fn test_read_strategy_tracking() {
        let metrics = SearchMetrics::new();

        metrics.record_read(1000);
        metrics.record_read(MMAP_THRESHOLD);
        metrics.record_read(20_000_000);

        let stats = metrics.get_stats();
        assert_eq!(stats.small_reads, 1);
        assert_eq!(stats.mmap_reads, 2);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = SearchMetrics::new();
        let worker_view = metrics.clone();

        worker_view.record_file_processed(3);
        worker_view.record_file_processed(0);

        let stats = metrics.get_stats();
        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.matches_found, 3);
    }
}
