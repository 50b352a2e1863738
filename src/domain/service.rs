//! Product Domain Service
//!
//! Pure business rules that span more than one product. No I/O and no
//! hidden state; every function takes its inputs explicitly.

use crate::domain::product::Product;
use chrono::{DateTime, Utc};

/// Score bonus for products with stock on hand
pub const IN_STOCK_BONUS: i64 = 10;

/// Score bonus for products updated within [`SCORE_FRESHNESS_DAYS`]
pub const FRESHNESS_BONUS: i64 = 5;

/// Freshness window used by scoring (wider than the entity's own
/// recently-updated window)
pub const SCORE_FRESHNESS_DAYS: i64 = 7;

/// Ascending by rank. Stable: equal ranks keep their input order.
pub fn sort_by_rank(products: &[Product]) -> Vec<Product> {
    let mut sorted = products.to_vec();
    sorted.sort_by_key(|p| p.rank());
    sorted
}

/// By price, ascending or descending. Stable in both directions.
pub fn sort_by_price(products: &[Product], ascending: bool) -> Vec<Product> {
    let mut sorted = products.to_vec();
    if ascending {
        sorted.sort_by(|a, b| a.price().total_cmp(&b.price()));
    } else {
        sorted.sort_by(|a, b| b.price().total_cmp(&a.price()));
    }
    sorted
}

/// Exact match on category id
pub fn filter_by_category(products: &[Product], category_id: &str) -> Vec<Product> {
    products
        .iter()
        .filter(|p| p.category_id() == category_id)
        .cloned()
        .collect()
}

pub fn find_by_id<'a>(products: &'a [Product], id: &str) -> Option<&'a Product> {
    products.iter().find(|p| p.id() == id)
}

/// Relevance score: rank, plus bonuses for stock and freshness
pub fn calculate_product_score(product: &Product) -> i64 {
    calculate_product_score_at(product, Utc::now())
}

pub fn calculate_product_score_at(product: &Product, now: DateTime<Utc>) -> i64 {
    let mut score = product.rank();

    if product.is_in_stock() {
        score += IN_STOCK_BONUS;
    }

    if (now - product.updated_at()).num_days() <= SCORE_FRESHNESS_DAYS {
        score += FRESHNESS_BONUS;
    }

    score
}

/// Descending by score. Stable: equal scores keep their input order.
pub fn sort_by_score(products: &[Product]) -> Vec<Product> {
    sort_by_score_at(products, Utc::now())
}

pub fn sort_by_score_at(products: &[Product], now: DateTime<Utc>) -> Vec<Product> {
    let mut scored: Vec<(i64, Product)> = products
        .iter()
        .map(|p| (calculate_product_score_at(p, now), p.clone()))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, p)| p).collect()
}

/// Products can be grouped only when there is at least one and all are in stock
pub fn can_products_be_grouped(products: &[Product]) -> bool {
    !products.is_empty() && products.iter().all(Product::is_in_stock)
}
