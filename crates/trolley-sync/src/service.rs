//! Validated mutation façade over the active cart.

use crate::error::CartError;
use crate::selector::ActiveCartSelector;
use std::sync::Arc;
use trolley_core::{Cart, CartItem, Catalog, ItemId};

/// Entry point for all cart mutations.
///
/// Validates requests against the catalog, then reads and writes
/// through the [`ActiveCartSelector`]. Every call re-fetches before
/// mutating; no cart value is held across a suspension point.
///
/// The service never caps quantities against availability; capping
/// happens only during sign-in reconciliation.
pub struct CartService {
    catalog: Arc<dyn Catalog>,
    selector: Arc<ActiveCartSelector>,
}

impl CartService {
    /// Create a service over a catalog and selector.
    pub fn new(catalog: Arc<dyn Catalog>, selector: Arc<ActiveCartSelector>) -> Self {
        Self { catalog, selector }
    }

    /// Add quantity to an item in the active cart.
    ///
    /// Rejects quantities below one and items unknown to the catalog.
    /// Returns the updated snapshot.
    pub async fn add_item(&self, item: CartItem) -> Result<Cart, CartError> {
        if item.quantity < 1 {
            return Err(CartError::InvalidQuantity(item.quantity));
        }
        self.ensure_sellable(&item.item_id).await?;

        let cart = self.selector.fetch().await?;
        let updated = cart.add_item(&item);
        self.selector.save(updated.clone()).await?;
        Ok(updated)
    }

    /// Set an item's quantity exactly.
    ///
    /// A quantity of zero removes the item; negative quantities are
    /// rejected.
    pub async fn set_item(&self, item: CartItem) -> Result<Cart, CartError> {
        if item.quantity < 0 {
            return Err(CartError::InvalidQuantity(item.quantity));
        }
        if item.quantity == 0 {
            return self.remove_item(&item.item_id).await;
        }
        self.ensure_sellable(&item.item_id).await?;

        let cart = self.selector.fetch().await?;
        let updated = cart.set_item(&item);
        self.selector.save(updated.clone()).await?;
        Ok(updated)
    }

    /// Remove an item from the active cart. No-op if absent.
    ///
    /// Not validated against the catalog: removing an item that has
    /// since been discontinued must still succeed.
    pub async fn remove_item(&self, item_id: &ItemId) -> Result<Cart, CartError> {
        let cart = self.selector.fetch().await?;
        let updated = cart.remove_item(item_id);
        self.selector.save(updated.clone()).await?;
        Ok(updated)
    }

    async fn ensure_sellable(&self, item_id: &ItemId) -> Result<(), CartError> {
        match self.catalog.available_quantity(item_id).await? {
            Some(_) => Ok(()),
            None => Err(CartError::ItemNotFound(item_id.clone())),
        }
    }
}
