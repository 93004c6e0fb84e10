//! Cache types for catalogue responses.

use std::sync::Arc;

use crate::models::{Brand, Category, Product};

/// Cache key for catalogue listings.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Categories,
    Brands,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<Category>>),
    Brands(Arc<Vec<Brand>>),
}
