//! Cache Metrics
//!
//! Lock-free counters for the caching port, read through point-in-time
//! snapshots.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one cache instance
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Reads served from a fresh entry
    pub hits: AtomicU64,
    /// Reads that went to the inner port
    pub misses: AtomicU64,
    /// Misses caused by an entry past its stale time
    pub stale: AtomicU64,
    /// Entries dropped by writes
    pub invalidations: AtomicU64,
    /// Entries dropped for exceeding their GC time
    pub evictions: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A stale entry counts as a miss too
    #[inline]
    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
        self.record_miss();
    }

    #[inline]
    pub fn record_invalidations(&self, count: u64) {
        self.invalidations.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Create a snapshot of current metrics
    pub fn snapshot(&self, entry_count: usize) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count,
        }
    }
}

/// Point-in-time snapshot of cache metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stale: u64,
    pub invalidations: u64,
    pub evictions: u64,
    pub entry_count: usize,
}

impl CacheStatsSnapshot {
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Calculate hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
