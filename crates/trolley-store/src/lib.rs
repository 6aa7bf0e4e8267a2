//! Cart persistence stores and change notification for Trolley.
//!
//! Two implementations of the [`CartStore`] capability interface sit
//! over a pluggable [`KeyValueBackend`]:
//!
//! - [`OfflineCartStore`]: the single identity-less slot
//! - [`IdentityCartStore`]: one slot per authenticated identity,
//!   resolved through the [`IdentityCartStores`] registry
//!
//! Each store pairs persistence with replay-latest change
//! notification via [`CartWatch`].

pub mod backend;
pub mod config;
pub mod error;
pub mod identity;
pub mod offline;
pub mod store;

pub use backend::{InMemoryBackend, KeyValueBackend};
pub use config::StoreConfig;
pub use error::StorageError;
pub use identity::{IdentityCartStore, IdentityCartStores};
pub use offline::OfflineCartStore;
pub use store::{CartStore, CartWatch};
