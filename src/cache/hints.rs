//! Cache Hints
//!
//! Per-scope freshness heuristics for cached API reads: how long data stays
//! fresh, how long it is kept at all, whether it should be refetched when a
//! consumer regains focus, retry behaviour and key construction.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

const MINUTE: u64 = 60 * 1000;

/// Longest delay suggested between retries
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Wrap the product port with the caching decorator
    pub enabled: bool,
    /// Stale time for scopes without a specific rule
    pub default_stale_ms: u64,
    /// GC time for scopes without a specific rule
    pub default_gc_ms: u64,
    pub max_retries: u32,
    /// Per-scope stale time overrides
    pub stale_overrides_ms: HashMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_stale_ms: 5 * MINUTE,
            default_gc_ms: 10 * MINUTE,
            max_retries: 3,
            stale_overrides_ms: HashMap::new(),
        }
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Cache key: a scope plus optional canonical parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub scope: String,
    /// Sorted, null-free parameters as compact JSON
    pub params: Option<String>,
}

impl CacheKey {
    /// Key parts in order, scope first
    pub fn parts(&self) -> Vec<&str> {
        let mut parts = vec![self.scope.as_str()];
        if let Some(params) = &self.params {
            parts.push(params);
        }
        parts
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.params {
            Some(params) => write!(f, "{}{}", self.scope, params),
            None => f.write_str(&self.scope),
        }
    }
}

/// Mutation kinds that invalidate cached reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOperation {
    Create,
    Update,
    Delete,
}

// =============================================================================
// Hints
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct CacheHints {
    config: CacheConfig,
}

impl CacheHints {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Override the stale time of one scope
    pub fn with_stale_time(mut self, scope: &str, stale: Duration) -> Self {
        self.config
            .stale_overrides_ms
            .insert(scope.to_string(), stale.as_millis() as u64);
        self
    }

    /// How long data in `scope` counts as fresh
    pub fn stale_time(&self, scope: &str) -> Duration {
        if let Some(ms) = self.config.stale_overrides_ms.get(scope) {
            return Duration::from_millis(*ms);
        }
        let ms = match scope {
            "products" => 5 * MINUTE,
            "search" => 2 * MINUTE,
            "user" => 10 * MINUTE,
            "config" => 30 * MINUTE,
            _ => self.config.default_stale_ms,
        };
        Duration::from_millis(ms)
    }

    /// How long unused data in `scope` is retained
    pub fn gc_time(&self, scope: &str) -> Duration {
        let ms = match scope {
            "search" => 5 * MINUTE,
            "products" => 10 * MINUTE,
            "user" => 30 * MINUTE,
            _ => self.config.default_gc_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn should_refetch_on_window_focus(&self, scope: &str) -> bool {
        !matches!(scope, "search" | "config")
    }

    /// Whether a read that has failed `failure_count` times should run again.
    ///
    /// Client errors are final; anything else retries up to the limit.
    pub fn should_retry(&self, failure_count: u32, err: &Error) -> bool {
        if matches!(err.status(), Some(status) if (400..500).contains(&status)) {
            return false;
        }
        failure_count < self.config.max_retries
    }

    /// `1s * 2^attempt`, capped at 30s
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(1)
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_RETRY_DELAY)
    }

    /// Build a key from `scope` and `params`; nulls are dropped, order is canonical
    pub fn create_cache_key<K, I>(&self, scope: &str, params: I) -> CacheKey
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let sorted: BTreeMap<String, Value> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .filter(|(_, v)| !v.is_null())
            .collect();

        let params = if sorted.is_empty() {
            None
        } else {
            serde_json::to_string(&sorted).ok()
        };

        CacheKey {
            scope: scope.to_string(),
            params,
        }
    }

    /// Scopes to drop after `operation` on `resource`
    pub fn invalidation_patterns(&self, operation: CacheOperation, resource: &str) -> Vec<String> {
        let kinds: &[&str] = match operation {
            CacheOperation::Create => &["list", "search"],
            CacheOperation::Update | CacheOperation::Delete => &["list", "detail", "search"],
        };
        kinds
            .iter()
            .map(|kind| format!("{}:{}", resource, kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::json;

    #[test]
    fn test_scope_times() {
        let hints = CacheHints::default();
        assert_eq!(hints.stale_time("products"), Duration::from_secs(300));
        assert_eq!(hints.stale_time("search"), Duration::from_secs(120));
        assert_eq!(hints.stale_time("config"), Duration::from_secs(1800));
        assert_eq!(hints.stale_time("anything"), Duration::from_secs(300));
        assert_eq!(hints.gc_time("user"), Duration::from_secs(1800));
        assert_eq!(hints.gc_time("config"), Duration::from_secs(600));

        let tuned = hints.with_stale_time("search", Duration::from_millis(5));
        assert_eq!(tuned.stale_time("search"), Duration::from_millis(5));
    }

    #[test]
    fn test_refetch_on_focus() {
        let hints = CacheHints::default();
        assert!(hints.should_refetch_on_window_focus("products"));
        assert!(!hints.should_refetch_on_window_focus("search"));
        assert!(!hints.should_refetch_on_window_focus("config"));
        assert!(hints.should_refetch_on_window_focus("other"));
    }

    #[test]
    fn test_retry_hints() {
        let hints = CacheHints::default();
        let not_found: Error = ApiError::new(404, "HTTP_404", "gone").into();
        let unavailable: Error = ApiError::new(503, "HTTP_503", "busy").into();

        assert!(!hints.should_retry(0, &not_found));
        assert!(hints.should_retry(2, &unavailable));
        assert!(!hints.should_retry(3, &unavailable));

        assert_eq!(hints.retry_delay(0), Duration::from_secs(1));
        assert_eq!(hints.retry_delay(3), Duration::from_secs(8));
        assert_eq!(hints.retry_delay(6), Duration::from_secs(30));
    }

    #[test]
    fn test_cache_key_is_canonical() {
        let hints = CacheHints::default();
        let a = hints.create_cache_key(
            "products:list",
            vec![("rank", json!(2)), ("category", json!("books")), ("q", Value::Null)],
        );
        let b = hints.create_cache_key(
            "products:list",
            vec![("category", json!("books")), ("rank", json!(2))],
        );
        assert_eq!(a, b);
        assert_eq!(a.to_string(), r#"products:list{"category":"books","rank":2}"#);

        let bare = hints.create_cache_key("products:list", Vec::<(&str, Value)>::new());
        assert_eq!(bare.params, None);
        assert_eq!(bare.parts(), vec!["products:list"]);
    }

    #[test]
    fn test_invalidation_patterns() {
        let hints = CacheHints::default();
        assert_eq!(
            hints.invalidation_patterns(CacheOperation::Create, "products"),
            vec!["products:list", "products:search"]
        );
        assert_eq!(
            hints.invalidation_patterns(CacheOperation::Delete, "products"),
            vec!["products:list", "products:detail", "products:search"]
        );
    }
}
