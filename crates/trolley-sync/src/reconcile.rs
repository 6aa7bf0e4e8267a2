//! One-shot merge of the offline cart into the identity cart on sign-in.

use crate::error::ReconcileError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use trolley_core::{CartItem, Catalog, IdentityId, IdentityState};
use trolley_store::{CartStore, IdentityCartStores, OfflineCartStore};

/// Watches the identity signal and merges the offline cart into the
/// identity-scoped cart on every anonymous-to-authenticated
/// transition.
///
/// Construct it once at process/session start; it exposes no other
/// surface. Merge failures are logged and absorbed, and the offline
/// cart is preserved so a later sign-in can retry. Sign-out and
/// identity-to-identity transitions never trigger a merge.
pub struct ReconciliationEngine {
    observer: JoinHandle<()>,
}

impl ReconciliationEngine {
    /// Start observing the identity signal.
    pub fn spawn(
        offline: Arc<OfflineCartStore>,
        identity_stores: Arc<IdentityCartStores>,
        catalog: Arc<dyn Catalog>,
        identity: watch::Receiver<IdentityState>,
    ) -> Self {
        let reconciler = Arc::new(Reconciler {
            offline,
            identity_stores,
            catalog,
            merging: AtomicBool::new(false),
        });
        Self {
            observer: tokio::spawn(observe(reconciler, identity)),
        }
    }
}

impl Drop for ReconciliationEngine {
    fn drop(&mut self) {
        self.observer.abort();
    }
}

/// React to identity transitions, merging only on anonymous → authenticated.
async fn observe(reconciler: Arc<Reconciler>, mut identity: watch::Receiver<IdentityState>) {
    let mut previous = identity.borrow_and_update().clone();
    while identity.changed().await.is_ok() {
        let next = identity.borrow_and_update().clone();
        if previous.is_anonymous() {
            if let IdentityState::Authenticated(identity_id) = &next {
                reconciler.reconcile(identity_id).await;
            }
        }
        previous = next;
    }
}

/// Summary of a completed merge.
#[derive(Debug, Default, PartialEq, Eq)]
struct MergeOutcome {
    /// Items whose quantity was added to the identity cart.
    added_items: usize,
    /// Offline items dropped because the catalog no longer sells them.
    skipped_items: usize,
}

struct Reconciler {
    offline: Arc<OfflineCartStore>,
    identity_stores: Arc<IdentityCartStores>,
    catalog: Arc<dyn Catalog>,
    /// Idle/Merging guard; at most one merge in flight per engine.
    merging: AtomicBool,
}

impl Reconciler {
    async fn reconcile(&self, identity_id: &IdentityId) {
        if self.merging.swap(true, Ordering::SeqCst) {
            tracing::debug!(identity = %identity_id, "merge already in flight, ignoring trigger");
            return;
        }
        match self.merge_offline_cart(identity_id).await {
            Ok(outcome) => {
                tracing::info!(
                    identity = %identity_id,
                    added = outcome.added_items,
                    skipped = outcome.skipped_items,
                    "offline cart merged"
                );
            }
            Err(e) => {
                tracing::warn!(
                    identity = %identity_id,
                    error = %e,
                    "cart merge failed, offline cart preserved"
                );
            }
        }
        self.merging.store(false, Ordering::SeqCst);
    }

    /// The merge algorithm.
    ///
    /// For every offline item, the post-merge identity quantity is
    /// capped at the catalog's available quantity, and never drops
    /// below what the identity cart already holds. The offline cart
    /// is cleared only after the merged identity cart has been saved.
    async fn merge_offline_cart(
        &self,
        identity_id: &IdentityId,
    ) -> Result<MergeOutcome, ReconcileError> {
        let offline_cart = self.offline.fetch().await?;
        if offline_cart.is_empty() {
            return Ok(MergeOutcome::default());
        }

        let identity_store = self.identity_stores.store_for(identity_id).await?;
        let identity_cart = identity_store.fetch().await?;

        let mut additions = Vec::new();
        let mut skipped_items = 0;
        for (item_id, offline_quantity) in offline_cart.items() {
            let identity_quantity = identity_cart.quantity_of(item_id);
            let available = match self.catalog.available_quantity(item_id).await? {
                Some(quantity) => quantity,
                None => {
                    skipped_items += 1;
                    tracing::debug!(item = %item_id, "item no longer sellable, dropped from merge");
                    continue;
                }
            };
            let capped_total = offline_quantity.saturating_add(identity_quantity).min(available);
            let delta = (capped_total - identity_quantity).max(0);
            if delta > 0 {
                additions.push(CartItem::new(item_id.clone(), delta));
            }
        }

        let mut merged = identity_cart;
        for item in &additions {
            merged = merged.add_item(item);
        }
        identity_store.save(merged).await?;
        // only a fully persisted merge may discard the offline copy
        self.offline.clear().await?;

        Ok(MergeOutcome {
            added_items: additions.len(),
            skipped_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::IdentitySignal;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};
    use trolley_core::{Cart, CatalogError, InMemoryCatalog, ItemId};
    use trolley_store::{
        InMemoryBackend, KeyValueBackend, StorageError, StoreConfig,
    };

    /// Backend that fails writes to keys containing an armed pattern.
    struct FlakyBackend {
        inner: InMemoryBackend,
        fail_writes_to: Mutex<Option<String>>,
    }

    impl FlakyBackend {
        fn new() -> Self {
            Self {
                inner: InMemoryBackend::new(),
                fail_writes_to: Mutex::new(None),
            }
        }

        fn fail_writes_to(&self, pattern: &str) {
            *self.fail_writes_to.lock().unwrap() = Some(pattern.to_string());
        }

        fn heal(&self) {
            *self.fail_writes_to.lock().unwrap() = None;
        }
    }

    #[async_trait]
    impl KeyValueBackend for FlakyBackend {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
            let armed = self.fail_writes_to.lock().unwrap().clone();
            if let Some(pattern) = armed {
                if key.contains(&pattern) {
                    return Err(StorageError::Backend("injected write failure".into()));
                }
            }
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.inner.delete(key).await
        }
    }

    /// Catalog that is always unreachable.
    struct UnreachableCatalog;

    #[async_trait]
    impl Catalog for UnreachableCatalog {
        async fn available_quantity(&self, _: &ItemId) -> Result<Option<i64>, CatalogError> {
            Err(CatalogError::Unavailable("connection refused".into()))
        }
    }

    struct Fixture {
        backend: Arc<FlakyBackend>,
        offline: Arc<OfflineCartStore>,
        identity_stores: Arc<IdentityCartStores>,
        catalog: Arc<InMemoryCatalog>,
    }

    async fn fixture() -> Fixture {
        let backend = Arc::new(FlakyBackend::new());
        let kv: Arc<dyn KeyValueBackend> = backend.clone();
        let config = StoreConfig::default();
        let offline = Arc::new(OfflineCartStore::open(kv.clone(), &config).await.unwrap());
        let identity_stores = Arc::new(IdentityCartStores::new(kv, config));
        Fixture {
            backend,
            offline,
            identity_stores,
            catalog: Arc::new(InMemoryCatalog::new()),
        }
    }

    impl Fixture {
        fn reconciler(&self) -> Reconciler {
            Reconciler {
                offline: self.offline.clone(),
                identity_stores: self.identity_stores.clone(),
                catalog: self.catalog.clone(),
                merging: AtomicBool::new(false),
            }
        }

        fn reconciler_with(&self, catalog: Arc<dyn Catalog>) -> Reconciler {
            Reconciler {
                offline: self.offline.clone(),
                identity_stores: self.identity_stores.clone(),
                catalog,
                merging: AtomicBool::new(false),
            }
        }

        async fn seed_offline(&self, entries: &[(&str, i64)]) {
            let cart: Cart = entries
                .iter()
                .map(|(id, qty)| (ItemId::new(*id), *qty))
                .collect();
            self.offline.save(cart).await.unwrap();
        }

        async fn seed_identity(&self, identity: &str, entries: &[(&str, i64)]) {
            let cart: Cart = entries
                .iter()
                .map(|(id, qty)| (ItemId::new(*id), *qty))
                .collect();
            self.identity_stores
                .store_for(&IdentityId::new(identity))
                .await
                .unwrap()
                .save(cart)
                .await
                .unwrap();
        }

        async fn identity_cart(&self, identity: &str) -> Cart {
            self.identity_stores
                .store_for(&IdentityId::new(identity))
                .await
                .unwrap()
                .fetch()
                .await
                .unwrap()
        }
    }

    fn qty(cart: &Cart, item: &str) -> i64 {
        cart.quantity_of(&ItemId::new(item))
    }

    #[tokio::test]
    async fn test_merge_moves_offline_items_into_identity_cart() {
        let fx = fixture().await;
        fx.catalog.set_availability("a", 10);
        fx.seed_offline(&[("a", 2)]).await;

        let outcome = fx
            .reconciler()
            .merge_offline_cart(&IdentityId::new("alice"))
            .await
            .unwrap();

        assert_eq!(outcome.added_items, 1);
        assert_eq!(qty(&fx.identity_cart("alice").await, "a"), 2);
        assert!(fx.offline.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_caps_total_at_availability() {
        let fx = fixture().await;
        fx.catalog.set_availability("a", 3);
        fx.seed_offline(&[("a", 5)]).await;
        fx.seed_identity("alice", &[("a", 1)]).await;

        fx.reconciler()
            .merge_offline_cart(&IdentityId::new("alice"))
            .await
            .unwrap();

        assert_eq!(qty(&fx.identity_cart("alice").await, "a"), 3);
        assert!(fx.offline.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_never_reduces_identity_quantity() {
        let fx = fixture().await;
        fx.catalog.set_availability("a", 3);
        fx.seed_offline(&[("a", 2)]).await;
        fx.seed_identity("alice", &[("a", 5)]).await;

        let outcome = fx
            .reconciler()
            .merge_offline_cart(&IdentityId::new("alice"))
            .await
            .unwrap();

        assert_eq!(outcome.added_items, 0);
        assert_eq!(qty(&fx.identity_cart("alice").await, "a"), 5);
    }

    #[tokio::test]
    async fn test_merge_skips_unsellable_items() {
        let fx = fixture().await;
        fx.catalog.set_availability("a", 10);
        fx.seed_offline(&[("a", 2), ("b", 1)]).await;

        let outcome = fx
            .reconciler()
            .merge_offline_cart(&IdentityId::new("alice"))
            .await
            .unwrap();

        assert_eq!(outcome.added_items, 1);
        assert_eq!(outcome.skipped_items, 1);
        let merged = fx.identity_cart("alice").await;
        assert_eq!(qty(&merged, "a"), 2);
        assert!(!merged.contains(&ItemId::new("b")));
        assert!(fx.offline.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_identity_save_preserves_offline_cart() {
        let fx = fixture().await;
        fx.catalog.set_availability("a", 10);
        fx.seed_offline(&[("a", 2)]).await;
        fx.backend.fail_writes_to("identity");

        let err = fx
            .reconciler()
            .merge_offline_cart(&IdentityId::new("alice"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Storage(_)));
        assert!(fx.identity_cart("alice").await.is_empty());
        assert_eq!(qty(&fx.offline.fetch().await.unwrap(), "a"), 2);

        // a later sign-in retries successfully
        fx.backend.heal();
        fx.reconciler()
            .merge_offline_cart(&IdentityId::new("alice"))
            .await
            .unwrap();
        assert_eq!(qty(&fx.identity_cart("alice").await, "a"), 2);
        assert!(fx.offline.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_catalog_aborts_merge() {
        let fx = fixture().await;
        fx.seed_offline(&[("a", 2)]).await;

        let err = fx
            .reconciler_with(Arc::new(UnreachableCatalog))
            .merge_offline_cart(&IdentityId::new("alice"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Catalog(_)));
        assert!(fx.identity_cart("alice").await.is_empty());
        assert_eq!(qty(&fx.offline.fetch().await.unwrap(), "a"), 2);
    }

    #[tokio::test]
    async fn test_empty_offline_cart_is_a_noop() {
        let fx = fixture().await;
        fx.seed_identity("alice", &[("a", 1)]).await;

        let outcome = fx
            .reconciler()
            .merge_offline_cart(&IdentityId::new("alice"))
            .await
            .unwrap();

        assert_eq!(outcome, MergeOutcome::default());
        assert_eq!(qty(&fx.identity_cart("alice").await, "a"), 1);
    }

    #[tokio::test]
    async fn test_repeat_merge_adds_nothing() {
        let fx = fixture().await;
        fx.catalog.set_availability("a", 10);
        fx.seed_offline(&[("a", 2)]).await;
        let reconciler = fx.reconciler();
        let alice = IdentityId::new("alice");

        reconciler.merge_offline_cart(&alice).await.unwrap();
        let outcome = reconciler.merge_offline_cart(&alice).await.unwrap();

        assert_eq!(outcome.added_items, 0);
        assert_eq!(qty(&fx.identity_cart("alice").await, "a"), 2);
    }

    #[tokio::test]
    async fn test_reentrant_trigger_is_ignored() {
        let fx = fixture().await;
        fx.catalog.set_availability("a", 10);
        fx.seed_offline(&[("a", 2)]).await;

        let reconciler = fx.reconciler();
        reconciler.merging.store(true, Ordering::SeqCst);
        reconciler.reconcile(&IdentityId::new("alice")).await;

        // nothing merged while another merge is in flight
        assert!(fx.identity_cart("alice").await.is_empty());
        assert_eq!(qty(&fx.offline.fetch().await.unwrap(), "a"), 2);
    }

    async fn wait_for<F, Fut>(mut condition: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        timeout(Duration::from_secs(1), async {
            while !condition().await {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_sign_in_triggers_merge() {
        let fx = fixture().await;
        fx.catalog.set_availability("a", 10);
        fx.seed_offline(&[("a", 2)]).await;

        let signal = IdentitySignal::anonymous();
        let _engine = ReconciliationEngine::spawn(
            fx.offline.clone(),
            fx.identity_stores.clone(),
            fx.catalog.clone(),
            signal.subscribe(),
        );

        signal.sign_in("alice");
        wait_for(|| async { qty(&fx.identity_cart("alice").await, "a") == 2 }).await;
        wait_for(|| async { fx.offline.fetch().await.unwrap().is_empty() }).await;
    }

    #[tokio::test]
    async fn test_sign_out_does_not_trigger_merge() {
        let fx = fixture().await;
        fx.catalog.set_availability("a", 10);
        fx.seed_offline(&[("a", 2)]).await;

        let signal = IdentitySignal::new(IdentityState::Authenticated(IdentityId::new("alice")));
        let _engine = ReconciliationEngine::spawn(
            fx.offline.clone(),
            fx.identity_stores.clone(),
            fx.catalog.clone(),
            signal.subscribe(),
        );

        signal.sign_out();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(qty(&fx.offline.fetch().await.unwrap(), "a"), 2);
        assert!(fx.identity_cart("alice").await.is_empty());
    }

    #[tokio::test]
    async fn test_identity_switch_does_not_trigger_merge() {
        let fx = fixture().await;
        fx.catalog.set_availability("a", 10);
        fx.seed_offline(&[("a", 2)]).await;

        let signal = IdentitySignal::new(IdentityState::Authenticated(IdentityId::new("alice")));
        let _engine = ReconciliationEngine::spawn(
            fx.offline.clone(),
            fx.identity_stores.clone(),
            fx.catalog.clone(),
            signal.subscribe(),
        );

        signal.sign_in("bob");
        sleep(Duration::from_millis(50)).await;

        assert_eq!(qty(&fx.offline.fetch().await.unwrap(), "a"), 2);
        assert!(fx.identity_cart("bob").await.is_empty());
    }
}
