//! Use-case container
//!
//! Builds every use case once from a single `ProductPort` and hands out
//! shared references. Wiring is explicit; there is no runtime registry.

use crate::application::use_cases::*;
use crate::domain::ports::ProductPortRef;
use std::sync::Arc;

/// All application use cases bound to one product source
#[derive(Clone)]
pub struct Container {
    port: ProductPortRef,
    get_all_products: Arc<GetAllProducts>,
    get_product_by_id: Arc<GetProductById>,
    search_products: Arc<SearchProducts>,
    get_products_by_category: Arc<GetProductsByCategory>,
    get_ranked_products: Arc<GetRankedProducts>,
    get_products_by_rank: Arc<GetProductsByRank>,
    get_scored_products: Arc<GetScoredProducts>,
    create_product: Arc<CreateProduct>,
    update_product: Arc<UpdateProduct>,
    update_product_stock: Arc<UpdateProductStock>,
    delete_product: Arc<DeleteProduct>,
}

impl Container {
    pub fn new(port: ProductPortRef) -> Self {
        Self {
            get_all_products: Arc::new(GetAllProducts::new(port.clone())),
            get_product_by_id: Arc::new(GetProductById::new(port.clone())),
            search_products: Arc::new(SearchProducts::new(port.clone())),
            get_products_by_category: Arc::new(GetProductsByCategory::new(port.clone())),
            get_ranked_products: Arc::new(GetRankedProducts::new(port.clone())),
            get_products_by_rank: Arc::new(GetProductsByRank::new(port.clone())),
            get_scored_products: Arc::new(GetScoredProducts::new(port.clone())),
            create_product: Arc::new(CreateProduct::new(port.clone())),
            update_product: Arc::new(UpdateProduct::new(port.clone())),
            update_product_stock: Arc::new(UpdateProductStock::new(port.clone())),
            delete_product: Arc::new(DeleteProduct::new(port.clone())),
            port,
        }
    }

    /// The port every use case was built with
    pub fn port(&self) -> &ProductPortRef {
        &self.port
    }

    pub fn get_all_products(&self) -> Arc<GetAllProducts> {
        self.get_all_products.clone()
    }

    pub fn get_product_by_id(&self) -> Arc<GetProductById> {
        self.get_product_by_id.clone()
    }

    pub fn search_products(&self) -> Arc<SearchProducts> {
        self.search_products.clone()
    }

    pub fn get_products_by_category(&self) -> Arc<GetProductsByCategory> {
        self.get_products_by_category.clone()
    }

    pub fn get_ranked_products(&self) -> Arc<GetRankedProducts> {
        self.get_ranked_products.clone()
    }

    pub fn get_products_by_rank(&self) -> Arc<GetProductsByRank> {
        self.get_products_by_rank.clone()
    }

    pub fn get_scored_products(&self) -> Arc<GetScoredProducts> {
        self.get_scored_products.clone()
    }

    pub fn create_product(&self) -> Arc<CreateProduct> {
        self.create_product.clone()
    }

    pub fn update_product(&self) -> Arc<UpdateProduct> {
        self.update_product.clone()
    }

    pub fn update_product_stock(&self) -> Arc<UpdateProductStock> {
        self.update_product_stock.clone()
    }

    pub fn delete_product(&self) -> Arc<DeleteProduct> {
        self.delete_product.clone()
    }
}
