//! Cart and wishlist, persisted in client storage so they survive restarts.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{FieldError, MwanamamaError};
use crate::model::cart::{OrderLine, OrderSummary, PricingPolicy};
use crate::storage::{Storage, StorageExt, keys};

/// An unreadable saved list is dropped rather than blocking the storefront.
fn load_list<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<Vec<T>, MwanamamaError> {
    match storage.get_json::<Vec<T>>(key) {
        Ok(items) => Ok(items.unwrap_or_default()),
        Err(MwanamamaError::Serialize(e)) => {
            warn!(key, error = %e, "discarding unreadable saved list");
            storage.remove(key)?;
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

pub struct Cart {
    storage: Arc<dyn Storage>,
}

impl Cart {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn items(&self) -> Result<Vec<OrderLine>, MwanamamaError> {
        load_list(self.storage.as_ref(), keys::CART)
    }

    /// Add a line, merging quantities with an existing line for the same item.
    /// The stored name, price and image are refreshed from `line`.
    pub fn add(&self, line: OrderLine) -> Result<(), MwanamamaError> {
        if line.unit_price.is_sign_negative() {
            return Err(MwanamamaError::Validation(vec![FieldError::invalid(
                "unitPrice",
                "must not be negative",
            )]));
        }
        if line.quantity == 0 {
            return Ok(());
        }
        let mut items = self.items()?;
        match items.iter_mut().find(|l| l.item_id == line.item_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                existing.name = line.name;
                existing.unit_price = line.unit_price;
                if line.image_url.is_some() {
                    existing.image_url = line.image_url;
                }
            }
            None => items.push(line),
        }
        self.save(&items)
    }

    /// Set the quantity of an item already in the cart. Zero removes it.
    pub fn set_quantity(&self, item_id: i64, quantity: u32) -> Result<(), MwanamamaError> {
        if quantity == 0 {
            return self.remove(item_id);
        }
        let mut items = self.items()?;
        let Some(line) = items.iter_mut().find(|l| l.item_id == item_id) else {
            debug!(item_id, "quantity update for item not in cart");
            return Ok(());
        };
        line.quantity = quantity;
        self.save(&items)
    }

    pub fn remove(&self, item_id: i64) -> Result<(), MwanamamaError> {
        let mut items = self.items()?;
        let before = items.len();
        items.retain(|l| l.item_id != item_id);
        if items.len() != before {
            self.save(&items)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), MwanamamaError> {
        self.storage.remove(keys::CART)?;
        Ok(())
    }

    /// Total units across all lines, for the header badge.
    pub fn count(&self) -> Result<u32, MwanamamaError> {
        Ok(self.items()?.iter().fold(0u32, |n, l| n.saturating_add(l.quantity)))
    }

    /// Freeze the current contents into a checkout snapshot.
    pub fn summary(&self, policy: &PricingPolicy) -> Result<OrderSummary, MwanamamaError> {
        Ok(OrderSummary::compute(self.items()?, policy))
    }

    fn save(&self, items: &[OrderLine]) -> Result<(), MwanamamaError> {
        self.storage.set_json(keys::CART, items)
    }
}

pub struct Wishlist {
    storage: Arc<dyn Storage>,
}

impl Wishlist {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn items(&self) -> Result<Vec<i64>, MwanamamaError> {
        load_list(self.storage.as_ref(), keys::WISHLIST)
    }

    pub fn contains(&self, item_id: i64) -> Result<bool, MwanamamaError> {
        Ok(self.items()?.contains(&item_id))
    }

    /// Add the item if absent, remove it if present. Returns whether it is now
    /// on the list.
    pub fn toggle(&self, item_id: i64) -> Result<bool, MwanamamaError> {
        let mut items = self.items()?;
        let added = match items.iter().position(|id| *id == item_id) {
            Some(pos) => {
                items.remove(pos);
                false
            }
            None => {
                items.push(item_id);
                true
            }
        };
        self.storage.set_json(keys::WISHLIST, &items)?;
        Ok(added)
    }

    pub fn clear(&self) -> Result<(), MwanamamaError> {
        self.storage.remove(keys::WISHLIST)?;
        Ok(())
    }
}
