//! Domain layer - Core business logic and port definitions
//!
//! This module defines the product entity, its collection and the pure
//! business rules over them, plus the traits (ports) that adapters and use
//! cases implement, following hexagonal architecture principles.

pub mod collection;
pub mod ports;
pub mod product;
pub mod service;

pub use collection::ProductCollection;
pub use ports::*;
pub use product::{validate_product_data, Product, ProductData};
