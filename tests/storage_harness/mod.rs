//! Shared test harness for storage backend testing
//!
//! Provides two related test entities, `Category` and `Product` (unique
//! `sku`, navigation `category` via `category_id`), and helpers for
//! seeding deterministic datasets.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//!
//! entity_store_tests!(make_database().await);
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod entity_store_tests;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use villa::core::entity::{Entity, TableSchema};
use villa::core::store::{Database, EntityStore};
use villa::impl_entity;

impl_entity!(
    Category,
    "harness_categories",
    {
        title: String,
    },
    unique [title]
);

impl_entity!(
    Product,
    "harness_products",
    {
        sku: String,
        name: String,
        price: f64,
        stock: i64,
        active: bool,
        #[serde(default)]
        category_id: Option<i64>,
        #[serde(default)]
        restocked_at: Option<DateTime<Utc>>,
    },
    unique [sku],
    navigations {
        category: Category => category_id,
    }
);

/// Every schema the harness writes to
pub fn harness_schemas() -> Vec<&'static TableSchema> {
    vec![Category::schema(), Product::schema()]
}

/// The n-th product of a deterministic dataset (n starts at 1)
pub fn product(n: usize) -> Product {
    Product {
        sku: format!("SKU-{:03}", n),
        name: format!("Product {:02}", n),
        price: n as f64 * 1.5,
        stock: (n % 7) as i64,
        active: n % 2 == 0,
        ..Default::default()
    }
}

pub fn category(title: &str) -> Category {
    Category {
        title: title.to_string(),
        ..Default::default()
    }
}

/// Create products 1..=n in order and return them with their identities
pub async fn seed_products(db: &Arc<dyn Database>, n: usize) -> Vec<Product> {
    let store = EntityStore::<Product>::new(db.clone());
    let mut created = Vec::with_capacity(n);
    for i in 1..=n {
        created.push(store.create(product(i)).await.unwrap());
    }
    created
}

pub fn skus(products: &[Product]) -> Vec<String> {
    products.iter().map(|p| p.sku.clone()).collect()
}

pub fn assert_count<T>(list: &[T], expected: usize) {
    assert_eq!(
        list.len(),
        expected,
        "Expected {} items, got {}",
        expected,
        list.len()
    );
}
