//! Domain Ports - Core trait definitions for the catalog
//!
//! These traits define the boundaries between the domain logic and external systems.
//! Adapters implement the outbound port; use cases implement the inbound one.

use crate::domain::product::{validate_product_data, ProductData};
use crate::error::{Result, ValidationError};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Write Payloads
// =============================================================================

/// Product payload without the server-generated fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub rank: i64,
    pub description: String,
    pub price: f64,
    pub category_id: String,
    pub image_url: String,
    #[serde(default)]
    pub stock: i64,
}

/// Partial product update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

impl ProductPatch {
    /// Patch touching only the stock level
    pub fn stock(stock: i64) -> Self {
        Self {
            stock: Some(stock),
            ..Default::default()
        }
    }

    /// Patch touching only the price
    pub fn price(price: f64) -> Self {
        Self {
            price: Some(price),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Run the product schema checks on the fields this patch sets
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let now = Utc::now();
        validate_product_data(&ProductData {
            id: String::new(),
            name: self.name.clone().unwrap_or_else(|| "unchanged".into()),
            rank: self.rank.unwrap_or(1),
            description: self.description.clone().unwrap_or_default(),
            price: self.price.unwrap_or(1.0),
            category_id: self.category_id.clone().unwrap_or_default(),
            image_url: self
                .image_url
                .clone()
                .unwrap_or_else(|| "https://unchanged.invalid/".into()),
            stock: self.stock.unwrap_or(0),
            created_at: now,
            updated_at: now,
        })
    }
}

impl NewProduct {
    /// Run the product schema checks before anything is sent
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let now = Utc::now();
        validate_product_data(&ProductData {
            id: String::new(),
            name: self.name.clone(),
            rank: self.rank,
            description: self.description.clone(),
            price: self.price,
            category_id: self.category_id.clone(),
            image_url: self.image_url.clone(),
            stock: self.stock,
            created_at: now,
            updated_at: now,
        })
    }
}

// =============================================================================
// Product Port (outbound)
// =============================================================================

/// Port for reading and mutating products in an external source
#[async_trait]
pub trait ProductPort: Send + Sync {
    /// Fetch the full product list.
    ///
    /// Kept for callers of the narrow list-only contract.
    async fn get_products(&self) -> Result<Vec<ProductData>> {
        self.find_all().await
    }

    /// Products at a given rank
    async fn find_by_rank(&self, rank: i64) -> Result<Vec<ProductData>>;

    /// Single product; `None` when the source has no such id
    async fn find_by_id(&self, id: &str) -> Result<Option<ProductData>>;

    async fn find_all(&self) -> Result<Vec<ProductData>>;

    /// Free-text search
    async fn search(&self, query: &str) -> Result<Vec<ProductData>>;

    async fn find_by_category(&self, category_id: &str) -> Result<Vec<ProductData>>;

    async fn create(&self, product: NewProduct) -> Result<ProductData>;

    async fn update(&self, id: &str, patch: ProductPatch) -> Result<ProductData>;

    async fn delete(&self, id: &str) -> Result<()>;
}

// =============================================================================
// Use Case Port (inbound)
// =============================================================================

/// A single application operation
#[async_trait]
pub trait UseCase: Send + Sync {
    type Input: Send + 'static;
    type Output: Send;

    async fn execute(&self, input: Self::Input) -> Result<Self::Output>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ProductPortRef = Arc<dyn ProductPort>;
