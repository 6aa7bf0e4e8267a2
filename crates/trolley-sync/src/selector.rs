//! Routing between the offline and identity-scoped cart stores.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use trolley_core::{Cart, IdentityState};
use trolley_store::{
    CartStore, CartWatch, IdentityCartStores, OfflineCartStore, StorageError,
};

/// Exposes one logical cart surface routed to whichever store matches
/// the current identity state.
///
/// Constructed once per process/session and passed by reference to
/// every consumer. Reads and writes re-evaluate routing at call time;
/// the watch surface re-subscribes whenever the identity changes, so
/// no stale emission from the previous store leaks past a switch.
pub struct ActiveCartSelector {
    offline: Arc<OfflineCartStore>,
    identity_stores: Arc<IdentityCartStores>,
    identity: watch::Receiver<IdentityState>,
    out: watch::Receiver<Cart>,
    forwarder: JoinHandle<()>,
}

impl ActiveCartSelector {
    /// Create a selector over the two stores, observing the given
    /// identity signal.
    ///
    /// Seeds the watch surface with the active store's current
    /// snapshot before any subscriber can attach.
    pub async fn new(
        offline: Arc<OfflineCartStore>,
        identity_stores: Arc<IdentityCartStores>,
        identity: watch::Receiver<IdentityState>,
    ) -> Result<Self, StorageError> {
        let state = identity.borrow().clone();
        let store = resolve_store(&offline, &identity_stores, &state).await?;
        let (out_tx, out_rx) = watch::channel(store.watch().current());

        let forwarder = tokio::spawn(forward(
            offline.clone(),
            identity_stores.clone(),
            identity.clone(),
            out_tx,
        ));

        Ok(Self {
            offline,
            identity_stores,
            identity,
            out: out_rx,
            forwarder,
        })
    }

    /// Subscribe to snapshots of the active cart.
    ///
    /// Emissions follow the active store; on an identity switch the
    /// new store's snapshot is visible immediately.
    pub fn watch(&self) -> CartWatch {
        CartWatch::new(self.out.clone())
    }

    /// Fetch the current cart from the store matching the identity
    /// state at the time of this call.
    pub async fn fetch(&self) -> Result<Cart, StorageError> {
        self.active_store().await?.fetch().await
    }

    /// Save to the store matching the identity state at the time of
    /// this call.
    pub async fn save(&self, cart: Cart) -> Result<(), StorageError> {
        self.active_store().await?.save(cart).await
    }

    async fn active_store(&self) -> Result<Arc<dyn CartStore>, StorageError> {
        let state = self.identity.borrow().clone();
        resolve_store(&self.offline, &self.identity_stores, &state).await
    }
}

impl Drop for ActiveCartSelector {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// The store matching an identity state.
async fn resolve_store(
    offline: &Arc<OfflineCartStore>,
    identity_stores: &IdentityCartStores,
    state: &IdentityState,
) -> Result<Arc<dyn CartStore>, StorageError> {
    match state {
        IdentityState::Anonymous => {
            let store: Arc<dyn CartStore> = offline.clone();
            Ok(store)
        }
        IdentityState::Authenticated(identity_id) => {
            let store: Arc<dyn CartStore> = identity_stores.store_for(identity_id).await?;
            Ok(store)
        }
    }
}

/// Forward snapshots from the active store into the output channel,
/// re-subscribing on every identity change.
async fn forward(
    offline: Arc<OfflineCartStore>,
    identity_stores: Arc<IdentityCartStores>,
    mut identity: watch::Receiver<IdentityState>,
    out: watch::Sender<Cart>,
) {
    loop {
        let state = identity.borrow_and_update().clone();
        let store = match resolve_store(&offline, &identity_stores, &state).await {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open active cart store");
                match identity.changed().await {
                    Ok(()) => continue,
                    Err(_) => return,
                }
            }
        };

        // Dropping the previous subscription on switch is what keeps
        // stale emissions from the old store out of the output.
        let mut cart_watch = store.watch();
        loop {
            tokio::select! {
                changed = identity.changed() => match changed {
                    Ok(()) => break,
                    Err(_) => return,
                },
                snapshot = cart_watch.next() => match snapshot {
                    Some(cart) => {
                        out.send_if_modified(|current| {
                            if *current == cart {
                                false
                            } else {
                                *current = cart;
                                true
                            }
                        });
                    }
                    None => match identity.changed().await {
                        Ok(()) => break,
                        Err(_) => return,
                    },
                },
            }
        }
    }
}
