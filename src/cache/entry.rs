//! Cache Entry Types
//!
//! Cached port reads and their freshness bookkeeping.

use crate::domain::product::ProductData;
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Cached Values
// =============================================================================

/// Result of a cached port read
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    List(Arc<Vec<ProductData>>),
    /// Single lookup; `None` records a known miss
    Single(Option<Arc<ProductData>>),
}

impl CachedValue {
    pub fn list(items: Vec<ProductData>) -> Self {
        CachedValue::List(Arc::new(items))
    }

    pub fn single(item: Option<ProductData>) -> Self {
        CachedValue::Single(item.map(Arc::new))
    }

    /// Products held by this value
    pub fn len(&self) -> usize {
        match self {
            CachedValue::List(items) => items.len(),
            CachedValue::Single(item) => usize::from(item.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Cache Entry
// =============================================================================

/// A cached value with its freshness windows
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CachedValue,
    /// Time when entry was stored
    pub stored_at: Instant,
    /// Served while younger than this
    pub stale_after: Duration,
    /// Retained while younger than this
    pub gc_after: Duration,
    /// Number of times this entry has been served
    pub access_count: u64,
}

impl CacheEntry {
    pub fn new(value: CachedValue, stale_after: Duration, gc_after: Duration) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
            stale_after,
            gc_after: gc_after.max(stale_after),
            access_count: 0,
        }
    }

    /// Record an access to this entry
    pub fn record_access(&mut self) {
        self.access_count += 1;
    }

    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    pub fn is_fresh(&self) -> bool {
        self.age() < self.stale_after
    }

    /// Past the retention window and safe to drop
    pub fn is_expired(&self) -> bool {
        self.age() >= self.gc_after
    }
}
