//! Adapters - `ProductPort` implementations
//!
//! - `http_products`: the catalog REST API via [`ApiClient`](crate::client::ApiClient)
//! - `memory`: in-process store for offline runs and tests

pub mod http_products;
pub mod memory;

pub use http_products::{HttpProductAdapter, ProductRoutes};
pub use memory::InMemoryProductPort;
