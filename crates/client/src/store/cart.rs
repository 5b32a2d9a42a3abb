//! The buyer's cart, persisted in the durable local store.
//!
//! Every mutation reads the whole collection, applies the change, and
//! writes the whole collection back, so cart state survives navigation and
//! restarts and concurrent screens never lose updates.

use farmart_core::{Email, ListingId, RawPrice};
use serde::{Deserialize, Serialize};

use super::{LocalStore, StorageError, keys};

/// One purchasable line in the cart.
///
/// `id` equals the listing id the buyer added. The price is carried raw;
/// normalization happens in pricing, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ListingId,
    pub title: String,
    pub price: RawPrice,
    #[serde(default = "default_qty")]
    pub qty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<Email>,
}

const fn default_qty() -> u32 {
    1
}

impl CartItem {
    /// Create a line for a listing with quantity 1.
    #[must_use]
    pub const fn new(id: ListingId, title: String, price: RawPrice) -> Self {
        Self {
            id,
            title,
            price,
            qty: 1,
            weight: None,
            owner_email: None,
        }
    }
}

/// What happens when a listing already in the cart is added again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddPolicy {
    /// Append a second line with quantity 1. This matches the marketplace's
    /// historical behavior: re-adding a listing yields two lines, not a
    /// merged quantity.
    #[default]
    Append,
    /// Increment the existing line's quantity instead of appending.
    MergeById,
}

/// Cart operations over the durable store.
#[derive(Debug, Clone)]
pub struct CartStore {
    store: LocalStore,
    policy: AddPolicy,
}

impl CartStore {
    /// Wrap a local store with the default [`AddPolicy::Append`].
    #[must_use]
    pub const fn new(store: LocalStore) -> Self {
        Self {
            store,
            policy: AddPolicy::Append,
        }
    }

    /// Override the add policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: AddPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The current cart contents. Malformed storage reads as empty.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.store.read_or_default(keys::CART)
    }

    /// Number of lines in the cart (not total quantity - the cart badge
    /// counts lines).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.items().len()
    }

    /// Add an item according to the configured [`AddPolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if persisting the updated cart fails.
    pub fn add_item(&self, item: CartItem) -> Result<(), StorageError> {
        let mut items = self.items();
        match self.policy {
            AddPolicy::Append => items.push(item),
            AddPolicy::MergeById => {
                if let Some(existing) = items.iter_mut().find(|line| line.id == item.id) {
                    existing.qty = existing.qty.saturating_add(item.qty.max(1));
                } else {
                    items.push(item);
                }
            }
        }
        self.persist(&items)
    }

    /// Adjust a line's quantity by `delta`, clamped to a floor of 1.
    ///
    /// A delta that would drive the quantity to zero or below leaves the
    /// line at quantity 1; it never removes the line. Unknown ids are a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if persisting the updated cart fails.
    pub fn set_quantity(&self, id: ListingId, delta: i64) -> Result<(), StorageError> {
        let items: Vec<CartItem> = self
            .items()
            .into_iter()
            .map(|mut line| {
                if line.id == id {
                    let next = i64::from(line.qty.max(1)) + delta;
                    line.qty = u32::try_from(next.max(1)).unwrap_or(1);
                }
                line
            })
            .collect();
        self.persist(&items)
    }

    /// Remove every line with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if persisting the updated cart fails.
    pub fn remove_item(&self, id: ListingId) -> Result<(), StorageError> {
        let items: Vec<CartItem> = self
            .items()
            .into_iter()
            .filter(|line| line.id != id)
            .collect();
        self.persist(&items)
    }

    /// Empty the cart. Called on successful payment.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if persisting the empty cart fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.persist(&[])
    }

    fn persist(&self, items: &[CartItem]) -> Result<(), StorageError> {
        self.store.write(keys::CART, &items)
    }
}
