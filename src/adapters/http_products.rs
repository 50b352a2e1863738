//! HTTP Product Adapter
//!
//! Binds [`ProductPort`] to the catalog REST API through [`ApiClient`].
//! List endpoints answer `{ "items": [...] }` (a bare array is accepted too),
//! single-entity endpoints answer `{ "data": {...} }`.

use crate::client::ApiClient;
use crate::domain::ports::{NewProduct, ProductPatch, ProductPort};
use crate::domain::product::ProductData;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Default route prefix of the product API
pub const DEFAULT_PRODUCTS_ROUTE: &str = "/api/products";

// =============================================================================
// Routes
// =============================================================================

/// Product endpoint paths under one base route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRoutes {
    base: String,
}

impl Default for ProductRoutes {
    fn default() -> Self {
        Self::new(DEFAULT_PRODUCTS_ROUTE)
    }
}

impl ProductRoutes {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn list(&self) -> String {
        self.base.clone()
    }

    pub fn by_rank(&self, rank: i64) -> String {
        format!("{}?rank={}", self.base, rank)
    }

    pub fn detail(&self, id: &str) -> String {
        format!("{}/{}", self.base, urlencoding::encode(id))
    }

    pub fn search(&self, query: &str) -> String {
        format!("{}/search?q={}", self.base, urlencoding::encode(query))
    }

    pub fn by_category(&self, category_id: &str) -> String {
        format!("{}/category/{}", self.base, urlencoding::encode(category_id))
    }
}

// =============================================================================
// Envelopes
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Items { items: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListBody<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ListBody::Items { items } => items,
            ListBody::Bare(items) => items,
        }
    }
}

#[derive(Deserialize)]
struct DataBody<T> {
    data: T,
}

// =============================================================================
// Adapter
// =============================================================================

pub struct HttpProductAdapter {
    client: Arc<ApiClient>,
    routes: ProductRoutes,
    retry_reads: bool,
}

impl HttpProductAdapter {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            routes: ProductRoutes::default(),
            retry_reads: false,
        }
    }

    pub fn with_routes(mut self, routes: ProductRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Run reads under the client's retry policy. Writes are never retried.
    pub fn with_retry_reads(mut self, enabled: bool) -> Self {
        self.retry_reads = enabled;
        self
    }

    pub fn routes(&self) -> &ProductRoutes {
        &self.routes
    }

    async fn read<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        if self.retry_reads {
            self.client
                .request_with_retry(|| self.client.get::<T>(path))
                .await
        } else {
            self.client.get(path).await
        }
    }

    async fn list(&self, path: &str) -> Result<Vec<ProductData>> {
        let body: ListBody<ProductData> = self.read(path).await?;
        let items = body.into_items();
        debug!(path, count = items.len(), "Fetched product list");
        Ok(items)
    }
}

#[async_trait]
impl ProductPort for HttpProductAdapter {
    async fn find_by_rank(&self, rank: i64) -> Result<Vec<ProductData>> {
        self.list(&self.routes.by_rank(rank)).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ProductData>> {
        match self.read::<DataBody<ProductData>>(&self.routes.detail(id)).await {
            Ok(body) => Ok(Some(body.data)),
            Err(Error::Api(err)) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn find_all(&self) -> Result<Vec<ProductData>> {
        self.list(&self.routes.list()).await
    }

    async fn search(&self, query: &str) -> Result<Vec<ProductData>> {
        self.list(&self.routes.search(query)).await
    }

    async fn find_by_category(&self, category_id: &str) -> Result<Vec<ProductData>> {
        self.list(&self.routes.by_category(category_id)).await
    }

    async fn create(&self, product: NewProduct) -> Result<ProductData> {
        let body: DataBody<ProductData> = self.client.post(&self.routes.list(), &product).await?;
        Ok(body.data)
    }

    async fn update(&self, id: &str, patch: ProductPatch) -> Result<ProductData> {
        let body: DataBody<ProductData> = self.client.put(&self.routes.detail(id), &patch).await?;
        Ok(body.data)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        // Response body, if any, is ignored
        let _: serde_json::Value = self.client.delete(&self.routes.detail(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::serve;
    use crate::client::{ApiClientConfig, RetryPolicy};
    use crate::domain::product::tests::sample_data;
    use assert_matches::assert_matches;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn catalog() -> Vec<ProductData> {
        let mut book = sample_data("2", 1);
        book.category_id = "books & media".into();
        vec![sample_data("1", 2), book]
    }

    fn products_api() -> Router {
        Router::new()
            .route(
                "/api/products",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    let items: Vec<ProductData> = match params.get("rank") {
                        Some(rank) => catalog()
                            .into_iter()
                            .filter(|p| p.rank.to_string() == *rank)
                            .collect(),
                        None => catalog(),
                    };
                    Json(json!({ "items": items }))
                })
                .post(|Json(body): Json<NewProduct>| async move {
                    let mut created = sample_data("new", body.rank);
                    created.name = body.name;
                    (StatusCode::CREATED, Json(json!({ "data": created })))
                }),
            )
            .route(
                "/api/products/search",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    let q = params.get("q").cloned().unwrap_or_default();
                    let items: Vec<ProductData> = catalog()
                        .into_iter()
                        .filter(|p| p.name.contains(&q))
                        .collect();
                    Json(json!({ "items": items }))
                }),
            )
            .route(
                "/api/products/category/:category",
                get(|Path(category): Path<String>| async move {
                    let items: Vec<ProductData> = catalog()
                        .into_iter()
                        .filter(|p| p.category_id == category)
                        .collect();
                    Json(items)
                }),
            )
            .route(
                "/api/products/:id",
                get(|Path(id): Path<String>| async move {
                    match id.as_str() {
                        "boom" => (StatusCode::INTERNAL_SERVER_ERROR, "down").into_response(),
                        _ => match catalog().into_iter().find(|p| p.id == id) {
                            Some(p) => Json(json!({ "data": p })).into_response(),
                            None => StatusCode::NOT_FOUND.into_response(),
                        },
                    }
                })
                .put(|Path(id): Path<String>, Json(patch): Json<ProductPatch>| async move {
                    let mut product = sample_data(&id, 1);
                    if let Some(stock) = patch.stock {
                        product.stock = stock;
                    }
                    Json(json!({ "data": product }))
                })
                .delete(|| async { StatusCode::NO_CONTENT }),
            )
    }

    async fn adapter() -> HttpProductAdapter {
        let base = serve(products_api()).await;
        let client = ApiClient::new(ApiClientConfig::new(base)).unwrap();
        HttpProductAdapter::new(Arc::new(client))
    }

    #[test]
    fn test_routes() {
        let routes = ProductRoutes::new("/api/products/");
        assert_eq!(routes.list(), "/api/products");
        assert_eq!(routes.by_rank(3), "/api/products?rank=3");
        assert_eq!(routes.search("red shoes"), "/api/products/search?q=red%20shoes");
        assert_eq!(routes.detail("a/b"), "/api/products/a%2Fb");
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let adapter = adapter().await;

        let found = adapter.find_by_id("1").await.unwrap().unwrap();
        assert_eq!(found, sample_data("1", 2));

        assert_eq!(adapter.find_by_id("missing").await.unwrap(), None);

        let err = adapter.find_by_id("boom").await.unwrap_err();
        assert_matches!(err, Error::Api(ref e) if e.status == 500);
    }

    #[tokio::test]
    async fn test_list_queries() {
        let adapter = adapter().await;

        assert_eq!(adapter.find_all().await.unwrap().len(), 2);
        assert_eq!(adapter.get_products().await.unwrap().len(), 2);

        let ranked = adapter.find_by_rank(1).await.unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "2");

        let found = adapter.search("Product 1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");

        // Bare array body, encoded path segment
        let books = adapter.find_by_category("books & media").await.unwrap();
        assert_eq!(books.len(), 1);
    }

    #[tokio::test]
    async fn test_writes() {
        let adapter = adapter().await;

        let created = adapter
            .create(NewProduct {
                name: "Desk".into(),
                rank: 4,
                description: "Oak desk".into(),
                price: 120.0,
                category_id: "furniture".into(),
                image_url: "https://example.com/desk.jpg".into(),
                stock: 2,
            })
            .await
            .unwrap();
        assert_eq!(created.name, "Desk");
        assert_eq!(created.rank, 4);

        let updated = adapter.update("7", ProductPatch::stock(42)).await.unwrap();
        assert_eq!(updated.id, "7");
        assert_eq!(updated.stock, 42);

        adapter.delete("7").await.unwrap();
    }

    #[tokio::test]
    async fn test_retry_reads() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let base = serve(Router::new().route(
            "/api/products",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        StatusCode::BAD_GATEWAY.into_response()
                    } else {
                        Json(json!({ "items": catalog() })).into_response()
                    }
                }
            }),
        ))
        .await;

        let client = ApiClient::new(
            ApiClientConfig::new(base)
                .with_retry(RetryPolicy::new(2, Duration::from_millis(1)).with_jitter(Duration::ZERO)),
        )
        .unwrap();
        let adapter = HttpProductAdapter::new(Arc::new(client)).with_retry_reads(true);

        assert_eq!(adapter.find_all().await.unwrap().len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
