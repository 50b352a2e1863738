//! Read Caching
//!
//! Freshness hints and a caching decorator for any `ProductPort`.
//!
//! ```text
//!   use case ──► CachingProductPort ──► inner ProductPort (HTTP / memory)
//!                   │        ▲
//!         writes ───┘        └── fresh reads served from DashMap<CacheKey, CacheEntry>
//!   (invalidate list/search and the written product's detail)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use product_catalog::cache::{CacheHints, CachingProductPort};
//!
//! let port = CachingProductPort::new(adapter, CacheHints::default());
//! let first = port.find_all().await?;   // inner port
//! let again = port.find_all().await?;   // cache hit
//! println!("Hit ratio: {:.2}%", port.stats().hit_ratio() * 100.0);
//! ```

pub mod entry;
pub mod hints;
pub mod metrics;
pub mod port;

pub use entry::{CacheEntry, CachedValue};
pub use hints::{CacheConfig, CacheHints, CacheKey, CacheOperation};
pub use metrics::{CacheMetrics, CacheStatsSnapshot};
pub use port::CachingProductPort;
