//! Cache types for catalog and FAQ responses.

use std::sync::Arc;

use herbal_core::ProductId;

use super::types::{Faq, Product};

/// Cache key for cacheable backend reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Catalog,
    Product(ProductId),
    Faqs,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Catalog(Arc<Vec<Product>>),
    Product(Box<Product>),
    Faqs(Arc<Vec<Faq>>),
}
