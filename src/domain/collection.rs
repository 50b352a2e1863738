//! Product Collection
//!
//! Ordered, immutable sequence of products. Query operations return new
//! collections and never reorder `self`.

use crate::domain::product::{Product, ProductData};
use crate::domain::service;
use serde::Serialize;

/// Ordered collection of products
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductCollection {
    products: Vec<Product>,
}

impl ProductCollection {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Reconstitute every payload from a trusted source
    pub fn from_trusted(data: Vec<ProductData>) -> Self {
        Self::new(data.into_iter().map(Product::reconstitute).collect())
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Product> {
        self.products.iter()
    }

    pub fn as_slice(&self) -> &[Product] {
        &self.products
    }

    pub fn into_vec(self) -> Vec<Product> {
        self.products
    }

    /// Product ids in collection order
    pub fn ids(&self) -> Vec<&str> {
        self.products.iter().map(Product::id).collect()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Product> {
        service::find_by_id(&self.products, id)
    }

    pub fn filter_by_category(&self, category_id: &str) -> Self {
        Self::new(service::filter_by_category(&self.products, category_id))
    }

    pub fn sort_by_price(&self, ascending: bool) -> Self {
        Self::new(service::sort_by_price(&self.products, ascending))
    }

    pub fn sort_by_rank(&self) -> Self {
        Self::new(service::sort_by_rank(&self.products))
    }

    pub fn to_data(&self) -> Vec<ProductData> {
        self.products.iter().map(Product::to_data).collect()
    }
}

impl From<Vec<Product>> for ProductCollection {
    fn from(products: Vec<Product>) -> Self {
        Self::new(products)
    }
}

impl FromIterator<Product> for ProductCollection {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for ProductCollection {
    type Item = Product;
    type IntoIter = std::vec::IntoIter<Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.products.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProductCollection {
    type Item = &'a Product;
    type IntoIter = std::slice::Iter<'a, Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.products.iter()
    }
}

impl Serialize for ProductCollection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.products.iter().map(Product::to_data))
    }
}
