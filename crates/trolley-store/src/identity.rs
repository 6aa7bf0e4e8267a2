//! Identity-scoped cart storage.

use crate::backend::KeyValueBackend;
use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::store::{load_cart, persist_cart, CartStore, CartWatch};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use trolley_core::{Cart, IdentityId};

/// Cart storage scoped to one authenticated identity.
pub struct IdentityCartStore {
    backend: Arc<dyn KeyValueBackend>,
    identity_id: IdentityId,
    key: String,
    tx: watch::Sender<Cart>,
}

impl IdentityCartStore {
    /// Open the cart slot for an identity, seeding change notification
    /// with the persisted value.
    pub async fn open(
        backend: Arc<dyn KeyValueBackend>,
        config: &StoreConfig,
        identity_id: IdentityId,
    ) -> Result<Self, StorageError> {
        let key = config.identity_storage_key(&identity_id);
        let initial = load_cart(backend.as_ref(), &key).await?;
        Ok(Self {
            backend,
            identity_id,
            key,
            tx: watch::Sender::new(initial),
        })
    }

    /// The identity this store is scoped to.
    pub fn identity_id(&self) -> &IdentityId {
        &self.identity_id
    }
}

#[async_trait]
impl CartStore for IdentityCartStore {
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

/// Registry handing out one shared store instance per identity.
///
/// Change notification is per instance, so every consumer in the
/// process must resolve stores through the same registry to observe
/// each other's saves.
pub struct IdentityCartStores {
    backend: Arc<dyn KeyValueBackend>,
    config: StoreConfig,
    stores: Mutex<HashMap<IdentityId, Arc<IdentityCartStore>>>,
}

impl IdentityCartStores {
    /// Create a registry over a backend and key layout.
    pub fn new(backend: Arc<dyn KeyValueBackend>, config: StoreConfig) -> Self {
        Self {
            backend,
            config,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// The shared store for an identity, opening it on first use.
    pub async fn store_for(
        &self,
        identity_id: &IdentityId,
    ) -> Result<Arc<IdentityCartStore>, StorageError> {
        let mut stores = self.stores.lock().await;
        if let Some(store) = stores.get(identity_id) {
            return Ok(store.clone());
        }
        let store = Arc::new(
            IdentityCartStore::open(
                self.backend.clone(),
                &self.config,
                identity_id.clone(),
            )
            .await?,
        );
        stores.insert(identity_id.clone(), store.clone());
        Ok(store)
    }
}
