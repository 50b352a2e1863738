//! Use Cases
//!
//! One object per application operation. Each holds the outbound port,
//! fetches through it, and hands the payloads to the domain layer. Port
//! errors are returned unchanged; the only translation is a missing single
//! product becoming [`Error::NotFound`].

use crate::domain::collection::ProductCollection;
use crate::domain::ports::{NewProduct, ProductPatch, ProductPortRef, UseCase};
use crate::domain::product::Product;
use crate::domain::service;
use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

// =============================================================================
// Queries
// =============================================================================

/// Every product, in source order
pub struct GetAllProducts {
    port: ProductPortRef,
}

impl GetAllProducts {
    pub fn new(port: ProductPortRef) -> Self {
        Self { port }
    }
}

#[async_trait]
impl UseCase for GetAllProducts {
    type Input = ();
    type Output = ProductCollection;

    async fn execute(&self, _input: ()) -> Result<ProductCollection> {
        let data = self.port.find_all().await?;
        debug!(count = data.len(), "Fetched all products");
        Ok(ProductCollection::from_trusted(data))
    }
}

/// A single product by id
pub struct GetProductById {
    port: ProductPortRef,
}

impl GetProductById {
    pub fn new(port: ProductPortRef) -> Self {
        Self { port }
    }
}

#[async_trait]
impl UseCase for GetProductById {
    type Input = String;
    type Output = Product;

    async fn execute(&self, id: String) -> Result<Product> {
        match self.port.find_by_id(&id).await? {
            Some(data) => Ok(Product::reconstitute(data)),
            None => {
                debug!(product_id = %id, "Product lookup found nothing");
                Err(Error::product_not_found(id))
            }
        }
    }
}

/// Free-text product search
pub struct SearchProducts {
    port: ProductPortRef,
}

impl SearchProducts {
    pub fn new(port: ProductPortRef) -> Self {
        Self { port }
    }
}

#[async_trait]
impl UseCase for SearchProducts {
    type Input = String;
    type Output = ProductCollection;

    async fn execute(&self, query: String) -> Result<ProductCollection> {
        let data = self.port.search(&query).await?;
        debug!(query = %query, count = data.len(), "Search completed");
        Ok(ProductCollection::from_trusted(data))
    }
}

/// Products in one category
pub struct GetProductsByCategory {
    port: ProductPortRef,
}

impl GetProductsByCategory {
    pub fn new(port: ProductPortRef) -> Self {
        Self { port }
    }
}

#[async_trait]
impl UseCase for GetProductsByCategory {
    type Input = String;
    type Output = ProductCollection;

    async fn execute(&self, category_id: String) -> Result<ProductCollection> {
        let data = self.port.find_by_category(&category_id).await?;
        Ok(ProductCollection::from_trusted(data))
    }
}

/// Every product ordered by ascending rank (the primary ranking)
pub struct GetRankedProducts {
    port: ProductPortRef,
}

impl GetRankedProducts {
    pub fn new(port: ProductPortRef) -> Self {
        Self { port }
    }
}

#[async_trait]
impl UseCase for GetRankedProducts {
    type Input = ();
    type Output = ProductCollection;

    async fn execute(&self, _input: ()) -> Result<ProductCollection> {
        let data = self.port.get_products().await.map_err(|e| {
            warn!(error = %e, "Failed to get ranked products");
            e
        })?;
        Ok(ProductCollection::from_trusted(data).sort_by_rank())
    }
}

/// Products sitting at exactly one rank
pub struct GetProductsByRank {
    port: ProductPortRef,
}

impl GetProductsByRank {
    pub fn new(port: ProductPortRef) -> Self {
        Self { port }
    }
}

#[async_trait]
impl UseCase for GetProductsByRank {
    type Input = i64;
    type Output = ProductCollection;

    async fn execute(&self, rank: i64) -> Result<ProductCollection> {
        let data = self.port.find_by_rank(rank).await?;
        Ok(ProductCollection::from_trusted(data))
    }
}

/// Every product ordered by descending relevance score
pub struct GetScoredProducts {
    port: ProductPortRef,
}

impl GetScoredProducts {
    pub fn new(port: ProductPortRef) -> Self {
        Self { port }
    }
}

#[async_trait]
impl UseCase for GetScoredProducts {
    type Input = ();
    type Output = ProductCollection;

    async fn execute(&self, _input: ()) -> Result<ProductCollection> {
        let products = ProductCollection::from_trusted(self.port.get_products().await?);
        Ok(service::sort_by_score(products.as_slice()).into())
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Create a product; input and stored payload are both validated
pub struct CreateProduct {
    port: ProductPortRef,
}

impl CreateProduct {
    pub fn new(port: ProductPortRef) -> Self {
        Self { port }
    }
}

#[async_trait]
impl UseCase for CreateProduct {
    type Input = NewProduct;
    type Output = Product;

    async fn execute(&self, product: NewProduct) -> Result<Product> {
        product.validate()?;
        let data = self.port.create(product).await?;
        let product = Product::create(data)?;
        info!(product_id = %product.id(), "Product created");
        Ok(product)
    }
}

/// Apply a partial update after checking the fields it sets
pub struct UpdateProduct {
    port: ProductPortRef,
}

impl UpdateProduct {
    pub fn new(port: ProductPortRef) -> Self {
        Self { port }
    }
}

#[async_trait]
impl UseCase for UpdateProduct {
    type Input = (String, ProductPatch);
    type Output = Product;

    async fn execute(&self, (id, patch): (String, ProductPatch)) -> Result<Product> {
        patch.validate()?;
        let data = self.port.update(&id, patch).await?;
        info!(product_id = %id, "Product updated");
        Ok(Product::reconstitute(data))
    }
}

/// Set the stock level, enforcing the entity's stock rule before writing
pub struct UpdateProductStock {
    port: ProductPortRef,
}

impl UpdateProductStock {
    pub fn new(port: ProductPortRef) -> Self {
        Self { port }
    }
}

#[async_trait]
impl UseCase for UpdateProductStock {
    type Input = (String, i64);
    type Output = Product;

    async fn execute(&self, (id, stock): (String, i64)) -> Result<Product> {
        let current = self
            .port
            .find_by_id(&id)
            .await?
            .map(Product::reconstitute)
            .ok_or_else(|| Error::product_not_found(id.as_str()))?;

        let updated = current.update_stock(stock)?;
        let data = self
            .port
            .update(&id, ProductPatch::stock(updated.stock()))
            .await?;

        info!(product_id = %id, stock, "Product stock updated");
        Ok(Product::reconstitute(data))
    }
}

/// Remove a product
pub struct DeleteProduct {
    port: ProductPortRef,
}

impl DeleteProduct {
    pub fn new(port: ProductPortRef) -> Self {
        Self { port }
    }
}

#[async_trait]
impl UseCase for DeleteProduct {
    type Input = String;
    type Output = ();

    async fn execute(&self, id: String) -> Result<()> {
        self.port.delete(&id).await?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}
