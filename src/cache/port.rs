//! Caching Product Port
//!
//! `ProductPort` decorator that serves repeated reads from memory. Entries
//! are keyed with [`CacheHints::create_cache_key`], stay fresh for their
//! scope's stale time and are dropped by the writes that affect them.

use crate::cache::entry::{CacheEntry, CachedValue};
use crate::cache::hints::{CacheHints, CacheKey, CacheOperation};
use crate::cache::metrics::{CacheMetrics, CacheStatsSnapshot};
use crate::domain::ports::{NewProduct, ProductPatch, ProductPort};
use crate::domain::product::ProductData;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Resource name used for key scopes and invalidation patterns
pub const RESOURCE: &str = "products";

const LIST_SCOPE: &str = "products:list";
const DETAIL_SCOPE: &str = "products:detail";
const SEARCH_SCOPE: &str = "products:search";

enum Lookup {
    Hit(CachedValue),
    Stale,
    Miss,
}

pub struct CachingProductPort<P> {
    inner: P,
    hints: CacheHints,
    entries: DashMap<CacheKey, CacheEntry>,
    metrics: CacheMetrics,
    /// Bumped around every write; reads that straddle a bump are not stored
    epoch: AtomicU64,
}

impl<P: ProductPort> CachingProductPort<P> {
    pub fn new(inner: P, hints: CacheHints) -> Self {
        Self {
            inner,
            hints,
            entries: DashMap::new(),
            metrics: CacheMetrics::new(),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn hints(&self) -> &CacheHints {
        &self.hints
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.metrics.snapshot(self.entries.len())
    }

    pub fn clear(&self) {
        let removed = self.entries.len() as u64;
        self.entries.clear();
        self.metrics.record_invalidations(removed);
    }

    /// Drop entries past their GC time, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        self.metrics.record_evictions(removed as u64);
        removed
    }

    // =========================================================================
    // Keys
    // =========================================================================

    fn key(&self, scope: &str, params: Vec<(&str, Value)>) -> CacheKey {
        self.hints.create_cache_key(scope, params)
    }

    fn detail_key(&self, id: &str) -> CacheKey {
        self.key(DETAIL_SCOPE, vec![("id", json!(id))])
    }

    /// Hint scope governing freshness of entries under `key_scope`
    fn freshness_scope(key_scope: &str) -> &'static str {
        if key_scope == SEARCH_SCOPE {
            "search"
        } else {
            RESOURCE
        }
    }

    // =========================================================================
    // Storage
    // =========================================================================

    fn lookup(&self, key: &CacheKey) -> Option<CachedValue> {
        let lookup = match self.entries.get_mut(key) {
            Some(mut entry) if entry.is_fresh() => {
                entry.record_access();
                Lookup::Hit(entry.value.clone())
            }
            Some(_) => Lookup::Stale,
            None => Lookup::Miss,
        };

        match lookup {
            Lookup::Hit(value) => {
                trace!(key = %key, "Cache hit");
                self.metrics.record_hit();
                Some(value)
            }
            Lookup::Stale => {
                self.evict_stale(key);
                self.metrics.record_stale();
                None
            }
            Lookup::Miss => {
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Drop `key` only if it is still stale; a concurrent store may have replaced it
    fn evict_stale(&self, key: &CacheKey) -> bool {
        self.entries
            .remove_if(key, |_, entry| !entry.is_fresh())
            .is_some()
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn bump_epoch(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Store a read that started at `epoch`, unless a write has begun since
    fn store(&self, key: CacheKey, value: CachedValue, epoch: u64) {
        if self.current_epoch() != epoch {
            trace!(key = %key, "Discarding read that overlapped a write");
            return;
        }

        let scope = Self::freshness_scope(&key.scope);
        let entry = CacheEntry::new(value, self.hints.stale_time(scope), self.hints.gc_time(scope));
        self.entries.insert(key.clone(), entry);

        // A write may have started between the check and the insert
        if self.current_epoch() != epoch {
            self.entries.remove(&key);
        }
    }

    async fn load_list<F>(&self, key: CacheKey, fetch: F) -> Result<Vec<ProductData>>
    where
        F: Future<Output = Result<Vec<ProductData>>>,
    {
        if let Some(CachedValue::List(items)) = self.lookup(&key) {
            return Ok(items.as_ref().clone());
        }

        let epoch = self.current_epoch();
        let items = fetch.await?;
        self.store(key, CachedValue::list(items.clone()), epoch);
        Ok(items)
    }

    /// Drop entries affected by `operation`; `id` narrows detail invalidation
    fn invalidate(&self, operation: CacheOperation, id: Option<&str>) {
        self.bump_epoch();
        let patterns = self.hints.invalidation_patterns(operation, RESOURCE);
        let detail = id.map(|id| self.detail_key(id));

        let before = self.entries.len();
        self.entries.retain(|key, _| {
            if !patterns.iter().any(|p| *p == key.scope) {
                return true;
            }
            // Only the written product's detail entry goes
            key.scope == DETAIL_SCOPE && detail.as_ref().map_or(false, |d| d != key)
        });
        let removed = before.saturating_sub(self.entries.len());

        debug!(?operation, removed, "Invalidated cached product reads");
        self.metrics.record_invalidations(removed as u64);
    }
}

#[async_trait]
impl<P: ProductPort> ProductPort for CachingProductPort<P> {
    async fn find_by_rank(&self, rank: i64) -> Result<Vec<ProductData>> {
        let key = self.key(LIST_SCOPE, vec![("rank", json!(rank))]);
        self.load_list(key, self.inner.find_by_rank(rank)).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ProductData>> {
        let key = self.detail_key(id);
        if let Some(CachedValue::Single(item)) = self.lookup(&key) {
            return Ok(item.map(|p| p.as_ref().clone()));
        }

        let epoch = self.current_epoch();
        let item = self.inner.find_by_id(id).await?;
        self.store(key, CachedValue::single(item.clone()), epoch);
        Ok(item)
    }

    async fn find_all(&self) -> Result<Vec<ProductData>> {
        let key = self.key(LIST_SCOPE, Vec::new());
        self.load_list(key, self.inner.find_all()).await
    }

    async fn search(&self, query: &str) -> Result<Vec<ProductData>> {
        let key = self.key(SEARCH_SCOPE, vec![("q", json!(query))]);
        self.load_list(key, self.inner.search(query)).await
    }

    async fn find_by_category(&self, category_id: &str) -> Result<Vec<ProductData>> {
        let key = self.key(LIST_SCOPE, vec![("category", json!(category_id))]);
        self.load_list(key, self.inner.find_by_category(category_id))
            .await
    }

    async fn create(&self, product: NewProduct) -> Result<ProductData> {
        self.bump_epoch();
        let created = self.inner.create(product).await?;
        self.invalidate(CacheOperation::Create, None);
        Ok(created)
    }

    async fn update(&self, id: &str, patch: ProductPatch) -> Result<ProductData> {
        self.bump_epoch();
        let updated = self.inner.update(id, patch).await?;
        self.invalidate(CacheOperation::Update, Some(id));
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.bump_epoch();
        self.inner.delete(id).await?;
        self.invalidate(CacheOperation::Delete, Some(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryProductPort;
    use crate::domain::product::tests::sample_data;
    use std::time::Duration;

    fn cached() -> CachingProductPort<InMemoryProductPort> {
        CachingProductPort::new(
            InMemoryProductPort::with_products(vec![sample_data("1", 2), sample_data("2", 1)]),
            CacheHints::default(),
        )
    }

    #[tokio::test]
    async fn test_repeated_reads_hit_cache() {
        let port = cached();

        assert_eq!(port.find_all().await.unwrap().len(), 2);
        assert_eq!(port.find_all().await.unwrap().len(), 2);
        assert_eq!(port.find_by_rank(1).await.unwrap().len(), 1);
        assert_eq!(port.find_by_rank(1).await.unwrap().len(), 1);

        assert_eq!(port.inner().calls(), 2);
        let stats = port.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entry_count, 2);
    }

    #[tokio::test]
    async fn test_write_invalidates_cached_read() {
        let port = cached();

        assert_eq!(port.find_by_id("1").await.unwrap().unwrap().stock, 10);
        port.find_by_id("2").await.unwrap();
        port.find_all().await.unwrap();
        let calls = port.inner().calls();

        port.update("1", ProductPatch::stock(4)).await.unwrap();

        // Detail of "1" and the list are gone, detail of "2" survives
        assert_eq!(port.find_by_id("1").await.unwrap().unwrap().stock, 4);
        port.find_by_id("2").await.unwrap();
        assert_eq!(port.find_all().await.unwrap()[0].stock, 4);
        assert_eq!(port.inner().calls(), calls + 3);
        assert_eq!(port.stats().invalidations, 2);
    }

    #[tokio::test]
    async fn test_create_keeps_details() {
        let port = cached();
        port.find_by_id("1").await.unwrap();
        port.search("Product").await.unwrap();

        port.create(crate::domain::ports::NewProduct {
            name: "Product 3".into(),
            rank: 1,
            description: String::new(),
            price: 3.0,
            category_id: "electronics".into(),
            image_url: "https://example.com/3.jpg".into(),
            stock: 1,
        })
        .await
        .unwrap();

        assert_eq!(port.len(), 1);
        assert_eq!(port.search("Product").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_known_miss_is_cached() {
        let port = cached();
        assert!(port.find_by_id("nope").await.unwrap().is_none());
        assert!(port.find_by_id("nope").await.unwrap().is_none());
        assert_eq!(port.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_entries_are_refetched() {
        let port = CachingProductPort::new(
            InMemoryProductPort::with_products(vec![sample_data("1", 1)]),
            CacheHints::default().with_stale_time(RESOURCE, Duration::ZERO),
        );

        port.find_all().await.unwrap();
        port.find_all().await.unwrap();

        assert_eq!(port.inner().calls(), 2);
        assert_eq!(port.stats().stale, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let port = cached();
        assert!(port.delete("missing").await.is_err());
        assert!(port.update("missing", ProductPatch::stock(1)).await.is_err());
        assert!(port.is_empty());
        assert_eq!(port.stats().invalidations, 0);
    }

    /// Inner port whose reads take a snapshot and then stall
    struct SlowReads(InMemoryProductPort);

    #[async_trait]
    impl ProductPort for SlowReads {
        async fn find_by_rank(&self, rank: i64) -> Result<Vec<ProductData>> {
            self.0.find_by_rank(rank).await
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<ProductData>> {
            let item = self.0.find_by_id(id).await?;
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(item)
        }

        async fn find_all(&self) -> Result<Vec<ProductData>> {
            let items = self.0.find_all().await?;
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(items)
        }

        async fn search(&self, query: &str) -> Result<Vec<ProductData>> {
            self.0.search(query).await
        }

        async fn find_by_category(&self, category_id: &str) -> Result<Vec<ProductData>> {
            self.0.find_by_category(category_id).await
        }

        async fn create(&self, product: NewProduct) -> Result<ProductData> {
            self.0.create(product).await
        }

        async fn update(&self, id: &str, patch: ProductPatch) -> Result<ProductData> {
            self.0.update(id, patch).await
        }

        async fn delete(&self, id: &str) -> Result<()> {
            self.0.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_read_overlapping_write_is_not_cached() {
        let port = std::sync::Arc::new(CachingProductPort::new(
            SlowReads(InMemoryProductPort::with_products(vec![sample_data("1", 1)])),
            CacheHints::default(),
        ));

        let reader = {
            let port = port.clone();
            tokio::spawn(async move { port.find_by_id("1").await })
        };
        let lister = {
            let port = port.clone();
            tokio::spawn(async move { port.find_all().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        port.update("1", ProductPatch::stock(4)).await.unwrap();

        // In-flight reads saw the old snapshot but must not be stored
        assert_eq!(reader.await.unwrap().unwrap().unwrap().stock, 10);
        assert_eq!(lister.await.unwrap().unwrap()[0].stock, 10);
        assert!(port.is_empty());

        assert_eq!(port.find_by_id("1").await.unwrap().unwrap().stock, 4);
        assert_eq!(port.find_all().await.unwrap()[0].stock, 4);
    }

    #[tokio::test]
    async fn test_stale_eviction_spares_fresh_replacement() {
        let port = cached();
        port.find_by_id("1").await.unwrap();
        let key = port.detail_key("1");

        assert!(!port.evict_stale(&key));
        assert_eq!(port.len(), 1);

        port.store(key.clone(), CachedValue::single(None), port.current_epoch());
        port.entries.alter(&key, |_, mut entry| {
            entry.stale_after = Duration::ZERO;
            entry
        });
        assert!(port.evict_stale(&key));
        assert!(port.is_empty());
    }

    #[tokio::test]
    async fn test_purge_and_clear() {
        let port = cached();
        port.find_all().await.unwrap();
        assert_eq!(port.purge_expired(), 0);

        port.clear();
        assert!(port.is_empty());
    }
}
