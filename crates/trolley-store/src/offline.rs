//! Cart storage for sessions without an authenticated identity.

use crate::backend::KeyValueBackend;
use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::store::{load_cart, persist_cart, CartStore, CartWatch};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use trolley_core::Cart;

/// The identity-less cart slot.
///
/// One instance exists per process, opened once at startup and passed
/// by reference to every consumer; change notification is tied to the
/// instance, not the backend.
pub struct OfflineCartStore {
    backend: Arc<dyn KeyValueBackend>,
    key: String,
    tx: watch::Sender<Cart>,
}

impl OfflineCartStore {
    /// Open the offline slot, seeding change notification with the
    /// persisted value.
    pub async fn open(
        backend: Arc<dyn KeyValueBackend>,
        config: &StoreConfig,
    ) -> Result<Self, StorageError> {
        let key = config.offline_storage_key();
        let initial = load_cart(backend.as_ref(), &key).await?;
        Ok(Self {
            backend,
            key,
            tx: watch::Sender::new(initial),
        })
    }

    /// Replace the offline cart with an empty one.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.save(Cart::empty()).await
    }
}

#[async_trait]
impl CartStore for OfflineCartStore {
    async fn fetch(&self) -> Result<Cart, StorageError> {
        load_cart(self.backend.as_ref(), &self.key).await
    }

    async fn save(&self, cart: Cart) -> Result<(), StorageError> {
        persist_cart(self.backend.as_ref(), &self.key, &cart).await?;
        self.tx.send_replace(cart);
        Ok(())
    }

    fn watch(&self) -> CartWatch {
        CartWatch::new(self.tx.subscribe())
    }
}
