//! Cache types for catalog responses.

use std::sync::Arc;

use shopfront_core::ProductId;

use crate::types::Product;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Product(ProductId),
}

#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
}
