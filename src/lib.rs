//! Product Catalog - hexagonal core for an e-commerce product catalog
//!
//! Product entity and business rules, use cases over a product port, and
//! the outbound adapters that reach the catalog REST API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                          Application (Container)                            │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────────┐  │
//! │  │   Read Cases    │  │   Ranking /     │  │       Write Cases           │  │
//! │  │ (all/id/search) │  │   Scoring       │  │ (create/update/stock/del)   │  │
//! │  └────────┬────────┘  └────────┬────────┘  └─────────────┬───────────────┘  │
//! │           └────────────────────┼─────────────────────────┘                  │
//! ├────────────────────────────────┼────────────────────────────────────────────┤
//! │                  Domain (Product, Collection, Service)                      │
//! │                                │                                            │
//! │                    ┌───────────┴───────────┐                                │
//! │                    │      ProductPort      │                                │
//! │                    └───────────┬───────────┘                                │
//! ├────────────────────────────────┼────────────────────────────────────────────┤
//! │                           Adapters                                          │
//! │  ┌─────────────────┐  ┌────────┴────────┐  ┌─────────────────────────────┐  │
//! │  │ CachingProduct  │─►│ HttpProduct     │─►│ ApiClient                   │  │
//! │  │ Port (optional) │  │ Adapter         │  │ (auth, retry, logging,      │  │
//! │  └─────────────────┘  └─────────────────┘  │  performance monitor)       │  │
//! │                       ┌─────────────────┐  └─────────────────────────────┘  │
//! │                       │ InMemoryProduct │                                   │
//! │                       │ Port            │                                   │
//! │                       └─────────────────┘                                   │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domain`]: Product entity, collection, business rules and ports
//! - [`application`]: Use cases and the dependency container
//! - [`adapters`]: HTTP and in-memory `ProductPort` implementations
//! - [`client`]: API client with authentication and retry
//! - [`cache`]: Freshness hints and a caching `ProductPort` decorator
//! - [`monitoring`]: Request logger and performance monitor
//! - [`config`]: Layered configuration
//! - [`error`]: Error types and handling

pub mod adapters;
pub mod application;
pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod monitoring;

// Re-export commonly used types
pub use adapters::{HttpProductAdapter, InMemoryProductPort, ProductRoutes};

pub use application::{
    Container, CreateProduct, DeleteProduct, GetAllProducts, GetProductById,
    GetProductsByCategory, GetProductsByRank, GetRankedProducts, GetScoredProducts,
    SearchProducts, UpdateProduct, UpdateProductStock,
};

pub use cache::{CacheConfig, CacheHints, CacheKey, CacheOperation, CachingProductPort};

pub use client::{
    ApiClient, ApiClientConfig, AuthConfig, AuthKind, AuthManager, AuthTokens, RetryPolicy,
};

pub use config::CatalogConfig;

pub use domain::{
    NewProduct, Product, ProductCollection, ProductData, ProductPatch, ProductPort,
    ProductPortRef, UseCase,
};

pub use error::{ApiError, AuthError, Error, Result, ValidationError};

pub use monitoring::{PerformanceMonitor, PerformanceStats, RequestLogger};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
