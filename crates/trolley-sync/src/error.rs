//! Error types for cart mutations and reconciliation.

use thiserror::Error;
use trolley_core::{CatalogError, ItemId};
use trolley_store::StorageError;

/// Errors surfaced to cart mutation callers.
#[derive(Debug, Error)]
pub enum CartError {
    /// The item does not exist in the catalog.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// The requested quantity is not valid for the operation.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// The active store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The catalog lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// A failure inside a merge attempt.
///
/// Absorbed and logged by the reconciliation engine; never surfaced
/// to callers.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A store fetch or save failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An availability lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
