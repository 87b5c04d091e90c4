//! Durable client storage.
//!
//! A small key-value store of JSON blobs shared by independent flows (auth
//! tokens, cart, notifications, the payment hand-off). Values carry no schema
//! version; readers deserialize into whatever type they expect.

pub mod file;
pub mod memory;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::MwanamamaError;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Well-known keys. Each holds one JSON document.
pub mod keys {
    pub const NOTIFICATIONS: &str = "mwanamama_notifications";
    pub const ADMIN: &str = "admin";
    pub const ADMIN_TOKEN: &str = "adminToken";
    pub const USER_TOKEN: &str = "userToken";
    pub const USER_DATA: &str = "userData";
    pub const AUTH_TOKEN: &str = "authToken";
    pub const PAYMENT_COMPLETION: &str = "paymentCompletionData";
    pub const PAYMENT_ABANDONED: &str = "paymentAbandonedCheckouts";
    pub const CART: &str = "mwanamama_cart";
    pub const WISHLIST: &str = "mwanamama_wishlist";
}

pub trait Storage: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>, MwanamamaError>;

    fn set_raw(&self, key: &str, value: String) -> Result<(), MwanamamaError>;

    /// Remove a key, returning the value it held.
    fn remove(&self, key: &str) -> Result<Option<String>, MwanamamaError>;
}

/// Typed JSON helpers over any [`Storage`].
pub trait StorageExt: Storage {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, MwanamamaError> {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), MwanamamaError> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw)
    }

    /// Read and delete in one step. The key is gone even if the value no
    /// longer deserializes.
    fn take_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, MwanamamaError> {
        match self.remove(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

pub(crate) fn poisoned<T>(_: std::sync::PoisonError<T>) -> MwanamamaError {
    MwanamamaError::Storage("storage lock poisoned".into())
}
