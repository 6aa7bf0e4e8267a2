//! Immutable cart value type.

use crate::ids::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single cart mutation request: one item and a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Item being added, set, or removed.
    pub item_id: ItemId,
    /// Requested quantity.
    pub quantity: i64,
}

impl CartItem {
    /// Create a new mutation request.
    pub fn new(item_id: impl Into<ItemId>, quantity: i64) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
        }
    }
}

/// An immutable snapshot of a shopping cart.
///
/// Maps item identifiers to quantities. Every stored quantity is at
/// least one; operations that would leave a zero or negative quantity
/// drop the entry instead. All operations return a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: BTreeMap<ItemId, i64>,
}

impl Cart {
    /// Create an empty cart.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Quantity for an item, or zero if absent.
    pub fn quantity_of(&self, item_id: &ItemId) -> i64 {
        self.items.get(item_id).copied().unwrap_or(0)
    }

    /// Check whether an item is present.
    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.items.contains_key(item_id)
    }

    /// Iterate over `(item, quantity)` entries in item order.
    pub fn items(&self) -> impl Iterator<Item = (&ItemId, i64)> {
        self.items.iter().map(|(id, qty)| (id, *qty))
    }

    /// Total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.values().sum()
    }

    /// Number of unique items.
    pub fn unique_item_count(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Return a cart with the item's quantity increased by the request.
    ///
    /// A non-positive request quantity leaves the cart unchanged.
    #[must_use]
    pub fn add_item(&self, item: &CartItem) -> Self {
        if item.quantity <= 0 {
            return self.clone();
        }
        let mut items = self.items.clone();
        let quantity = items
            .get(&item.item_id)
            .copied()
            .unwrap_or(0)
            .saturating_add(item.quantity);
        items.insert(item.item_id.clone(), quantity);
        Self { items }
    }

    /// Return a cart with the item's quantity set exactly.
    ///
    /// A quantity of zero or less removes the entry.
    #[must_use]
    pub fn set_item(&self, item: &CartItem) -> Self {
        let mut items = self.items.clone();
        if item.quantity <= 0 {
            items.remove(&item.item_id);
        } else {
            items.insert(item.item_id.clone(), item.quantity);
        }
        Self { items }
    }

    /// Return a cart without the given item. No-op if absent.
    #[must_use]
    pub fn remove_item(&self, item_id: &ItemId) -> Self {
        let mut items = self.items.clone();
        items.remove(item_id);
        Self { items }
    }

    /// Additive union of two carts.
    #[must_use]
    pub fn merge(&self, other: &Cart) -> Self {
        let mut items = self.items.clone();
        for (item_id, quantity) in &other.items {
            let total = items
                .get(item_id)
                .copied()
                .unwrap_or(0)
                .saturating_add(*quantity);
            items.insert(item_id.clone(), total);
        }
        Self { items }
    }
}

impl FromIterator<(ItemId, i64)> for Cart {
    fn from_iter<T: IntoIterator<Item = (ItemId, i64)>>(iter: T) -> Self {
        Self {
            items: iter
                .into_iter()
                .filter(|(_, quantity)| *quantity > 0)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart_of(entries: &[(&str, i64)]) -> Cart {
        entries
            .iter()
            .map(|(id, qty)| (ItemId::new(*id), *qty))
            .collect()
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::empty();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.quantity_of(&ItemId::new("a")), 0);
    }

    #[test]
    fn test_add_item() {
        let cart = Cart::empty().add_item(&CartItem::new("a", 2));
        assert_eq!(cart.quantity_of(&ItemId::new("a")), 2);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.unique_item_count(), 1);
    }

    #[test]
    fn test_add_same_item_accumulates() {
        let cart = Cart::empty()
            .add_item(&CartItem::new("a", 1))
            .add_item(&CartItem::new("a", 2));
        assert_eq!(cart.quantity_of(&ItemId::new("a")), 3);
        assert_eq!(cart.unique_item_count(), 1);
    }

    #[test]
    fn test_add_is_pure() {
        let original = Cart::empty().add_item(&CartItem::new("a", 1));
        let updated = original.add_item(&CartItem::new("a", 1));
        assert_eq!(original.quantity_of(&ItemId::new("a")), 1);
        assert_eq!(updated.quantity_of(&ItemId::new("a")), 2);
    }

    #[test]
    fn test_set_item() {
        let cart = cart_of(&[("a", 2)]).set_item(&CartItem::new("a", 5));
        assert_eq!(cart.quantity_of(&ItemId::new("a")), 5);
    }

    #[test]
    fn test_set_zero_removes() {
        let cart = Cart::empty()
            .add_item(&CartItem::new("x", 3))
            .set_item(&CartItem::new("x", 0));
        assert_eq!(cart, Cart::empty());
    }

    #[test]
    fn test_remove_item() {
        let cart = cart_of(&[("a", 2), ("b", 1)]).remove_item(&ItemId::new("a"));
        assert!(!cart.contains(&ItemId::new("a")));
        assert_eq!(cart.quantity_of(&ItemId::new("b")), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let cart = cart_of(&[("a", 2)]);
        assert_eq!(cart.remove_item(&ItemId::new("missing")), cart);
    }

    #[test]
    fn test_merge_is_additive() {
        let merged = cart_of(&[("a", 2), ("b", 1)]).merge(&cart_of(&[("a", 3), ("c", 4)]));
        assert_eq!(merged.quantity_of(&ItemId::new("a")), 5);
        assert_eq!(merged.quantity_of(&ItemId::new("b")), 1);
        assert_eq!(merged.quantity_of(&ItemId::new("c")), 4);
    }

    #[test]
    fn test_from_iter_drops_non_positive() {
        let cart = cart_of(&[("a", 2), ("b", 0), ("c", -1)]);
        assert_eq!(cart.unique_item_count(), 1);
        assert_eq!(cart.quantity_of(&ItemId::new("a")), 2);
    }
}
