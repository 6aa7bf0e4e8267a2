//! The cart store capability interface and its subscription type.

use crate::backend::KeyValueBackend;
use crate::error::StorageError;
use async_trait::async_trait;
use futures::Stream;
use tokio::sync::watch;
use trolley_core::Cart;

/// Persistence and change notification for one cart slot.
///
/// Ownership of the cart value lies with whichever store last wrote
/// it; every read produces a fresh immutable snapshot.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The current persisted cart, or an empty cart if none exists.
    async fn fetch(&self) -> Result<Cart, StorageError>;

    /// Replace the persisted cart wholesale (last-write-wins).
    ///
    /// Watchers are notified only when the write succeeds.
    async fn save(&self, cart: Cart) -> Result<(), StorageError>;

    /// Subscribe to cart snapshots.
    ///
    /// The subscription yields the current value immediately and a new
    /// snapshot after every successful `save`. Failed saves never emit.
    fn watch(&self) -> CartWatch;
}

/// A subscription to a store's cart snapshots.
///
/// Replays the latest snapshot on subscription. A slow consumer only
/// ever observes the most recent value; intermediate snapshots are
/// not queued.
pub struct CartWatch {
    rx: watch::Receiver<Cart>,
    primed: bool,
}

impl CartWatch {
    /// Wrap a receiver whose channel holds cart snapshots.
    pub fn new(rx: watch::Receiver<Cart>) -> Self {
        Self { rx, primed: false }
    }

    /// The latest snapshot, without waiting.
    pub fn current(&self) -> Cart {
        self.rx.borrow().clone()
    }

    /// The next snapshot.
    ///
    /// The first call resolves immediately with the current value.
    /// Returns `None` once the publishing store has been dropped.
    pub async fn next(&mut self) -> Option<Cart> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Adapt the subscription into a `futures` stream.
    pub fn into_stream(self) -> impl Stream<Item = Cart> + Send {
        futures::stream::unfold(self, |mut watch| async move {
            let cart = watch.next().await?;
            Some((cart, watch))
        })
    }
}

/// Load and decode the cart stored under `key`, empty if absent.
pub(crate) async fn load_cart(
    backend: &dyn KeyValueBackend,
    key: &str,
) -> Result<Cart, StorageError> {
    match backend.get(key).await? {
        Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
        None => Ok(Cart::empty()),
    }
}

/// Encode and persist a cart under `key`.
pub(crate) async fn persist_cart(
    backend: &dyn KeyValueBackend,
    key: &str,
    cart: &Cart,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec(cart)?;
    backend.set(key, &bytes).await
}
