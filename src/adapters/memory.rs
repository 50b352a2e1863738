//! In-Memory Product Adapter
//!
//! `ProductPort` backed by a map held in process. Mirrors the HTTP API's
//! semantics (404 on writes to unknown ids) so it can stand in for the
//! remote catalog when wiring use cases without a network.

use crate::domain::ports::{NewProduct, ProductPatch, ProductPort};
use crate::domain::product::ProductData;
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// In-process product store
#[derive(Default)]
pub struct InMemoryProductPort {
    /// Stored products, in insertion order
    products: RwLock<Vec<ProductData>>,
    /// Sequence for generated ids
    next_id: AtomicU64,
    /// Total port calls served
    calls: AtomicU64,
}

impl InMemoryProductPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store
    pub fn with_products(products: Vec<ProductData>) -> Self {
        Self {
            products: RwLock::new(products),
            ..Default::default()
        }
    }

    /// Number of port operations served so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Stored products keyed by id
    pub async fn snapshot(&self) -> BTreeMap<String, ProductData> {
        self.products
            .read()
            .await
            .iter()
            .map(|p| (p.id.clone(), p.clone()))
            .collect()
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    fn not_found(id: &str) -> ApiError {
        ApiError::new(404, "NOT_FOUND", format!("Product {} not found", id))
    }

    async fn filtered<F>(&self, predicate: F) -> Vec<ProductData>
    where
        F: Fn(&ProductData) -> bool,
    {
        self.record_call();
        self.products
            .read()
            .await
            .iter()
            .filter(|p| predicate(p))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProductPort for InMemoryProductPort {
    async fn find_by_rank(&self, rank: i64) -> Result<Vec<ProductData>> {
        Ok(self.filtered(|p| p.rank == rank).await)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ProductData>> {
        self.record_call();
        Ok(self.products.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<ProductData>> {
        Ok(self.filtered(|_| true).await)
    }

    async fn search(&self, query: &str) -> Result<Vec<ProductData>> {
        let needle = query.to_lowercase();
        Ok(self
            .filtered(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
            })
            .await)
    }

    async fn find_by_category(&self, category_id: &str) -> Result<Vec<ProductData>> {
        Ok(self.filtered(|p| p.category_id == category_id).await)
    }

    async fn create(&self, product: NewProduct) -> Result<ProductData> {
        self.record_call();
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Utc::now();
        let data = ProductData {
            id: format!("mem-{:06}", seq),
            name: product.name,
            rank: product.rank,
            description: product.description,
            price: product.price,
            category_id: product.category_id,
            image_url: product.image_url,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };

        debug!(product_id = %data.id, "Stored product in memory");
        self.products.write().await.push(data.clone());
        Ok(data)
    }

    async fn update(&self, id: &str, patch: ProductPatch) -> Result<ProductData> {
        self.record_call();
        let mut products = self.products.write().await;
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Self::not_found(id))?;

        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(rank) = patch.rank {
            product.rank = rank;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(category_id) = patch.category_id {
            product.category_id = category_id;
        }
        if let Some(image_url) = patch.image_url {
            product.image_url = image_url;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        product.updated_at = Utc::now().max(product.updated_at);

        Ok(product.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.record_call();
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            return Err(Self::not_found(id).into());
        }
        Ok(())
    }
}
