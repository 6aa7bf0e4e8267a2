//! Cart store routing and sign-in reconciliation for Trolley.
//!
//! This crate keeps one logical cart consistent across the offline
//! and identity-scoped stores:
//!
//! - **IdentitySignal**: the observable authentication state
//! - **ActiveCartSelector**: routes reads, writes, and subscriptions
//!   to whichever store the identity state makes authoritative
//! - **CartService**: the validated mutation façade
//! - **ReconciliationEngine**: merges the offline cart into the
//!   identity cart, inventory-aware, once per sign-in
//! - **CartSync**: one-stop wiring for all of the above

pub mod error;
pub mod reconcile;
pub mod selector;
pub mod service;
pub mod signal;
pub mod sync;

pub use error::{CartError, ReconcileError};
pub use reconcile::ReconciliationEngine;
pub use selector::ActiveCartSelector;
pub use service::CartService;
pub use signal::IdentitySignal;
pub use sync::{CartSync, CartSyncBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CartError;
    pub use crate::selector::ActiveCartSelector;
    pub use crate::service::CartService;
    pub use crate::signal::IdentitySignal;
    pub use crate::sync::{CartSync, CartSyncBuilder};

    pub use trolley_core::{Cart, CartItem, Catalog, IdentityId, IdentityState, ItemId};
    pub use trolley_store::{CartStore, CartWatch, KeyValueBackend, StoreConfig};
}
