//! Cart domain types and collaborator contracts for Trolley.
//!
//! This crate provides the leaf types of the cart synchronization
//! engine:
//!
//! - **Cart**: immutable item-to-quantity mapping with pure operations
//! - **Identity**: the anonymous/authenticated state driving store routing
//! - **Catalog**: the availability contract consumed during reconciliation

pub mod cart;
pub mod catalog;
pub mod identity;
pub mod ids;

pub use cart::{Cart, CartItem};
pub use catalog::{Catalog, CatalogError, InMemoryCatalog};
pub use identity::IdentityState;
pub use ids::{IdentityId, ItemId};
