//! Cache types for backend lookups.

use std::sync::Arc;

use lustre_core::payment::PaymentMethod;

use super::types::{Category, OrderStatus, Settings};

/// Cache key for read-mostly lookups.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    Settings,
    PaymentMethods,
    OrderStatuses,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Settings(Arc<Settings>),
    PaymentMethods(Arc<Vec<PaymentMethod>>),
    OrderStatuses(Arc<Vec<OrderStatus>>),
}
