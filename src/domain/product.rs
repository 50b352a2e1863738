//! Product Entity
//!
//! Immutable product value object. Raw [`ProductData`] is validated once at
//! the ingestion boundary ([`Product::create`]) and trusted afterwards.

use crate::error::{FieldViolation, ValidationError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Products created within this many days count as newly added
pub const NEWLY_ADDED_DAYS: i64 = 7;

/// Products updated within this many days count as recently updated
pub const RECENTLY_UPDATED_DAYS: i64 = 3;

// =============================================================================
// Product Data
// =============================================================================

/// Raw product payload exchanged with external systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    /// Unique product identifier
    pub id: String,
    /// Display name (non-empty)
    pub name: String,
    /// Merchandising rank, 1 is best
    pub rank: i64,
    pub description: String,
    /// Unit price (positive)
    pub price: f64,
    pub category_id: String,
    /// Absolute image URL
    pub image_url: String,
    /// Units available (never negative)
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Check every schema constraint on raw product data.
///
/// All violations are collected rather than stopping at the first one.
pub fn validate_product_data(data: &ProductData) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    if data.name.trim().is_empty() {
        violations.push(FieldViolation::new("name", "must not be empty"));
    }
    if data.rank < 1 {
        violations.push(FieldViolation::new("rank", "must be >= 1"));
    }
    if !(data.price.is_finite() && data.price > 0.0) {
        violations.push(FieldViolation::new("price", "must be positive"));
    }
    if data.stock < 0 {
        violations.push(FieldViolation::new("stock", "must be >= 0"));
    }
    if let Err(e) = reqwest::Url::parse(&data.image_url) {
        violations.push(FieldViolation::new(
            "imageUrl",
            format!("must be a valid URL ({})", e),
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

// =============================================================================
// Product Entity
// =============================================================================

/// Product entity with business rules
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    data: ProductData,
}

impl Product {
    /// Create a product from untrusted input
    pub fn create(data: ProductData) -> Result<Self, ValidationError> {
        validate_product_data(&data)?;
        Ok(Self { data })
    }

    /// Rebuild a product from an already-validated source
    pub fn reconstitute(data: ProductData) -> Self {
        Self { data }
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn rank(&self) -> i64 {
        self.data.rank
    }

    pub fn description(&self) -> &str {
        &self.data.description
    }

    pub fn price(&self) -> f64 {
        self.data.price
    }

    pub fn category_id(&self) -> &str {
        &self.data.category_id
    }

    pub fn image_url(&self) -> &str {
        &self.data.image_url
    }

    pub fn stock(&self) -> i64 {
        self.data.stock
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.data.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.data.updated_at
    }

    // =========================================================================
    // Business Rules
    // =========================================================================

    pub fn is_in_stock(&self) -> bool {
        self.data.stock > 0
    }

    /// Whether `quantity` units can be bought right now
    pub fn can_purchase(&self, quantity: i64) -> bool {
        quantity > 0 && self.data.stock >= quantity
    }

    pub fn is_newly_added(&self) -> bool {
        self.is_newly_added_at(Utc::now())
    }

    /// Whole days since creation, as of `now`, are within the window
    pub fn is_newly_added_at(&self, now: DateTime<Utc>) -> bool {
        (now - self.data.created_at).num_days() <= NEWLY_ADDED_DAYS
    }

    pub fn is_recently_updated(&self) -> bool {
        self.is_recently_updated_at(Utc::now())
    }

    pub fn is_recently_updated_at(&self, now: DateTime<Utc>) -> bool {
        (now - self.data.updated_at).num_days() <= RECENTLY_UPDATED_DAYS
    }

    // =========================================================================
    // State Transitions
    // =========================================================================

    /// New product with `new_stock` units
    pub fn update_stock(&self, new_stock: i64) -> Result<Product, ValidationError> {
        if new_stock < 0 {
            return Err(ValidationError::field("stock", "cannot be negative"));
        }

        Ok(Product {
            data: ProductData {
                stock: new_stock,
                updated_at: self.next_update_time(),
                ..self.data.clone()
            },
        })
    }

    /// New product priced at `new_price`
    pub fn update_price(&self, new_price: f64) -> Result<Product, ValidationError> {
        if !(new_price.is_finite() && new_price > 0.0) {
            return Err(ValidationError::field("price", "must be positive"));
        }

        Ok(Product {
            data: ProductData {
                price: new_price,
                updated_at: self.next_update_time(),
                ..self.data.clone()
            },
        })
    }

    /// Current time, nudged past the previous update so it always increases
    fn next_update_time(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let floor = self.data.updated_at + Duration::microseconds(1);
        now.max(floor)
    }

    // =========================================================================
    // Data Access
    // =========================================================================

    /// Copy of the underlying data
    pub fn to_data(&self) -> ProductData {
        self.data.clone()
    }

    pub fn into_data(self) -> ProductData {
        self.data
    }
}

impl From<Product> for ProductData {
    fn from(product: Product) -> Self {
        product.into_data()
    }
}
