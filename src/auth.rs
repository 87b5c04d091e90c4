//! Bearer-token supply for outgoing requests.
//!
//! The client asks a [`TokenProvider`] for the current token on every request
//! instead of carrying mutable default headers, so logging in or out is just
//! a storage write.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MwanamamaError;
use crate::storage::{Storage, StorageExt, keys};

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The token to attach, or `None` for an anonymous request.
    async fn bearer_token(&self) -> Result<Option<String>, MwanamamaError>;
}

/// No `Authorization` header at all.
pub struct Anonymous;

#[async_trait]
impl TokenProvider for Anonymous {
    async fn bearer_token(&self) -> Result<Option<String>, MwanamamaError> {
        Ok(None)
    }
}

/// A fixed token, e.g. for service accounts and tests.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<Option<String>, MwanamamaError> {
        Ok(Some(self.0.clone()))
    }
}

/// Reads the token from durable storage, trying each key in order.
pub struct StoredToken {
    storage: Arc<dyn Storage>,
    keys: Vec<&'static str>,
}

impl StoredToken {
    pub fn new(storage: Arc<dyn Storage>, keys: Vec<&'static str>) -> Self {
        Self { storage, keys }
    }

    /// Storefront customer: `userToken`, then the legacy `authToken`.
    pub fn customer(storage: Arc<dyn Storage>) -> Self {
        Self::new(storage, vec![keys::USER_TOKEN, keys::AUTH_TOKEN])
    }

    /// Back-office session: `adminToken` only.
    pub fn admin(storage: Arc<dyn Storage>) -> Self {
        Self::new(storage, vec![keys::ADMIN_TOKEN])
    }
}

#[async_trait]
impl TokenProvider for StoredToken {
    async fn bearer_token(&self) -> Result<Option<String>, MwanamamaError> {
        for key in &self.keys {
            // Tokens were historically written both as JSON strings and raw.
            let Some(raw) = self.storage.get_raw(key)? else {
                continue;
            };
            let token = self
                .storage
                .get_json::<String>(key)
                .ok()
                .flatten()
                .unwrap_or(raw);
            let token = token.trim();
            if !token.is_empty() {
                return Ok(Some(token.to_string()));
            }
        }
        Ok(None)
    }
}
