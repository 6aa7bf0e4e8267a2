//! Catalog collaborator contract.

use crate::ids::ItemId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Catalog lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog could not be reached.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Per-item availability supplied by the product catalog.
///
/// Availability is fetched on demand and never cached here; caching
/// policy belongs to the implementation.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Available quantity for an item, or `None` if the item is not
    /// sellable (unknown to the catalog).
    async fn available_quantity(&self, item_id: &ItemId) -> Result<Option<i64>, CatalogError>;
}

/// In-memory catalog (for development/testing).
#[derive(Default)]
pub struct InMemoryCatalog {
    availability: Mutex<HashMap<ItemId, i64>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the available quantity for an item.
    pub fn set_availability(&self, item_id: impl Into<ItemId>, quantity: i64) {
        self.availability
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item_id.into(), quantity);
    }

    /// Remove an item from the catalog entirely.
    pub fn discontinue(&self, item_id: &ItemId) {
        self.availability
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(item_id);
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn available_quantity(&self, item_id: &ItemId) -> Result<Option<i64>, CatalogError> {
        Ok(self
            .availability
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(item_id)
            .copied())
    }
}
