//! One-stop wiring for the cart synchronization stack.

use crate::reconcile::ReconciliationEngine;
use crate::selector::ActiveCartSelector;
use crate::service::CartService;
use crate::signal::IdentitySignal;
use std::sync::Arc;
use trolley_core::{Catalog, IdentityState};
use trolley_store::{
    CartWatch, IdentityCartStores, KeyValueBackend, OfflineCartStore, StorageError, StoreConfig,
};

/// Builder for the cart synchronization stack.
///
/// # Example
///
/// ```rust,ignore
/// let sync = CartSyncBuilder::new(backend, catalog)
///     .with_config(StoreConfig::default())
///     .build()
///     .await?;
///
/// sync.service().add_item(CartItem::new("sku-1", 2)).await?;
/// sync.identity().sign_in("user-42");
/// ```
pub struct CartSyncBuilder {
    backend: Arc<dyn KeyValueBackend>,
    catalog: Arc<dyn Catalog>,
    config: StoreConfig,
    initial_identity: IdentityState,
}

impl CartSyncBuilder {
    /// Create a builder over a persistence backend and a catalog.
    pub fn new(backend: Arc<dyn KeyValueBackend>, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            backend,
            catalog,
            config: StoreConfig::default(),
            initial_identity: IdentityState::Anonymous,
        }
    }

    /// Set the storage key layout.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the identity state the session starts in.
    pub fn with_initial_identity(mut self, state: IdentityState) -> Self {
        self.initial_identity = state;
        self
    }

    /// Open the stores and start the selector and reconciliation
    /// engine.
    pub async fn build(self) -> Result<CartSync, StorageError> {
        let offline = Arc::new(OfflineCartStore::open(self.backend.clone(), &self.config).await?);
        let identity_stores = Arc::new(IdentityCartStores::new(
            self.backend.clone(),
            self.config.clone(),
        ));
        let signal = IdentitySignal::new(self.initial_identity);

        let selector = Arc::new(
            ActiveCartSelector::new(
                offline.clone(),
                identity_stores.clone(),
                signal.subscribe(),
            )
            .await?,
        );
        let engine = ReconciliationEngine::spawn(
            offline,
            identity_stores,
            self.catalog.clone(),
            signal.subscribe(),
        );
        let service = CartService::new(self.catalog, selector.clone());

        Ok(CartSync {
            signal,
            selector,
            service,
            _engine: engine,
        })
    }
}

/// A wired cart synchronization stack for one process/session.
///
/// Holds the reconciliation engine alive for as long as the stack
/// exists; dropping the stack stops all background observation.
pub struct CartSync {
    signal: IdentitySignal,
    selector: Arc<ActiveCartSelector>,
    service: CartService,
    _engine: ReconciliationEngine,
}

impl CartSync {
    /// The mutation façade.
    pub fn service(&self) -> &CartService {
        &self.service
    }

    /// The identity signal, to be driven by the authentication layer.
    pub fn identity(&self) -> &IdentitySignal {
        &self.signal
    }

    /// Subscribe to snapshots of the active cart.
    pub fn watch(&self) -> CartWatch {
        self.selector.watch()
    }
}
