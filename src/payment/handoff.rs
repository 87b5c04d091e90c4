//! Carrying a settled payment across a full page load.
//!
//! The payment dialog writes one [`CompletionPayload`] under
//! `paymentCompletionData`; the completion page redeems it exactly once. The
//! key is deleted on read whatever its contents, so a reload cannot replay
//! an order submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::MwanamamaError;
use crate::model::cart::OrderSummary;
use crate::model::checkout::CheckoutFormData;
use crate::model::payment::Transaction;
use crate::storage::{Storage, StorageExt, keys};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionPayload {
    pub order_summary: OrderSummary,
    pub form_data: CheckoutFormData,
    pub checkout_request_id: String,
    pub transaction: Transaction,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CompletionPayload {
    pub fn new(
        order_summary: OrderSummary,
        form_data: CheckoutFormData,
        checkout_request_id: String,
        transaction: Transaction,
        now: DateTime<Utc>,
        ttl: std::time::Duration,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            order_summary,
            form_data,
            checkout_request_id,
            transaction,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    fn is_complete(&self) -> bool {
        !self.checkout_request_id.trim().is_empty() && !self.order_summary.is_empty()
    }
}

/// Result of trying to redeem the hand-off.
#[derive(Debug, Clone, PartialEq)]
pub enum Redemption {
    Ready(Box<CompletionPayload>),
    /// Nothing was stored.
    Missing,
    /// Something was stored but it is unreadable or lacks required parts.
    Incomplete,
    Expired { checkout_request_id: String },
}

/// Write the payload, replacing any earlier one.
pub fn persist(storage: &dyn Storage, payload: &CompletionPayload) -> Result<(), MwanamamaError> {
    storage.set_json(keys::PAYMENT_COMPLETION, payload)?;
    info!(
        checkout_request_id = %payload.checkout_request_id,
        expires_at = %payload.expires_at,
        "payment completion payload stored"
    );
    Ok(())
}

/// Read and delete the payload.
pub fn redeem(storage: &dyn Storage, now: DateTime<Utc>) -> Result<Redemption, MwanamamaError> {
    let payload = match storage.take_json::<CompletionPayload>(keys::PAYMENT_COMPLETION) {
        Ok(Some(payload)) => payload,
        Ok(None) => return Ok(Redemption::Missing),
        Err(MwanamamaError::Serialize(e)) => {
            warn!(error = %e, "discarding unreadable payment completion payload");
            return Ok(Redemption::Incomplete);
        }
        Err(e) => return Err(e),
    };

    if !payload.is_complete() {
        warn!(checkout_request_id = %payload.checkout_request_id, "discarding incomplete payment completion payload");
        return Ok(Redemption::Incomplete);
    }
    if payload.is_expired(now) {
        warn!(
            checkout_request_id = %payload.checkout_request_id,
            expired_at = %payload.expires_at,
            "discarding expired payment completion payload"
        );
        return Ok(Redemption::Expired {
            checkout_request_id: payload.checkout_request_id,
        });
    }

    Ok(Redemption::Ready(Box::new(payload)))
}
