use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::handoff::{self, CompletionPayload};
use super::poller::{PollOutcome, PollPolicy, poll_until_settled};
use super::session::{PaymentSession, PaymentState};
use super::PaymentGateway;
use crate::error::{FieldError, MwanamamaError};
use crate::model::cart::OrderSummary;
use crate::model::checkout::{CheckoutFormData, normalize_msisdn};
use crate::model::payment::{StkPushRequest, StkPushResponse};
use crate::storage::{Storage, StorageExt, keys};

/// Where the caller should load next once the payment has settled. A full
/// page load, so the completion page reads storage from scratch.
pub const COMPLETION_ROUTE: &str = "/payment-completion";

const MAX_ABANDONED_RECORDS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// The payload is in storage; navigate to `route`.
    Completed {
        route: &'static str,
        checkout_request_id: String,
    },
    Failed {
        message: String,
    },
    Expired {
        checkout_request_id: String,
    },
    /// The dialog was closed while waiting.
    Cancelled,
}

/// A push attempt that was closed or timed out before the gateway settled.
/// The payer may still complete it on their phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonedCheckout {
    pub checkout_request_id: String,
    pub amount: u64,
    pub abandoned_at: DateTime<Utc>,
}

/// Previously abandoned attempts, newest first.
pub fn abandoned_checkouts(storage: &dyn Storage) -> Result<Vec<AbandonedCheckout>, MwanamamaError> {
    Ok(storage
        .get_json::<Vec<AbandonedCheckout>>(keys::PAYMENT_ABANDONED)?
        .unwrap_or_default())
}

fn record_abandoned(storage: &dyn Storage, entry: AbandonedCheckout) -> Result<(), MwanamamaError> {
    warn!(
        checkout_request_id = %entry.checkout_request_id,
        amount = entry.amount,
        "payment attempt abandoned before settling"
    );
    let mut entries = abandoned_checkouts(storage)?;
    entries.retain(|e| e.checkout_request_id != entry.checkout_request_id);
    entries.insert(0, entry);
    entries.truncate(MAX_ABANDONED_RECORDS);
    storage.set_json(keys::PAYMENT_ABANDONED, &entries)
}

/// Closes whichever attempt the dialog is currently running.
///
/// Every clone targets the live attempt, including attempts started after the
/// handle was taken.
#[derive(Clone, Default)]
pub struct CancelHandle {
    current: Arc<Mutex<CancellationToken>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token().is_cancelled()
    }

    fn token(&self) -> CancellationToken {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a new attempt with a fresh token.
    fn renew(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = CancellationToken::new();
    }
}

/// One payment dialog: push, poll, hand off.
pub struct PaymentWorkflow<G: PaymentGateway + ?Sized> {
    gateway: Arc<G>,
    storage: Arc<dyn Storage>,
    policy: PollPolicy,
    handoff_ttl: Duration,
    summary: OrderSummary,
    form: CheckoutFormData,
    session: PaymentSession,
    cancel: CancelHandle,
}

impl<G: PaymentGateway + ?Sized> PaymentWorkflow<G> {
    pub fn new(
        gateway: Arc<G>,
        storage: Arc<dyn Storage>,
        policy: PollPolicy,
        handoff_ttl: Duration,
        summary: OrderSummary,
        form: CheckoutFormData,
    ) -> Self {
        Self {
            gateway,
            storage,
            policy,
            handoff_ttl,
            summary,
            form,
            session: PaymentSession::new(),
            cancel: CancelHandle::default(),
        }
    }

    pub fn session(&self) -> &PaymentSession {
        &self.session
    }

    pub fn summary(&self) -> &OrderSummary {
        &self.summary
    }

    /// A handle that closes the dialog from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Send the STK push. On error the session stays `Idle` and nothing retries.
    pub async fn initiate(&mut self, phone: &str) -> Result<StkPushResponse, MwanamamaError> {
        if self.session.state() != PaymentState::Idle {
            return Err(MwanamamaError::Payment(format!(
                "payment already {:?}",
                self.session.state()
            )));
        }

        if phone.trim().is_empty() {
            return Err(MwanamamaError::Validation(vec![FieldError::required("phone")]));
        }
        let phone_number =
            normalize_msisdn(phone).map_err(|e| MwanamamaError::Validation(vec![e]))?;
        let amount = self.summary.amount_due();
        if amount == 0 {
            return Err(MwanamamaError::Validation(vec![FieldError::invalid(
                "amount",
                "must be positive",
            )]));
        }

        let earlier = abandoned_checkouts(self.storage.as_ref())?;
        if let Some(last) = earlier.first() {
            warn!(
                previous = %last.checkout_request_id,
                "starting a new payment while an earlier attempt may still settle"
            );
        }

        self.cancel.renew();
        let req = StkPushRequest {
            phone_number: phone_number.clone(),
            amount,
        };
        let resp = match self.gateway.push(&req).await {
            Ok(resp) => resp,
            Err(e) => {
                self.session.record_push_error(e.user_message());
                return Err(e);
            }
        };

        self.session.begin_processing(
            phone_number,
            resp.checkout_request_id.clone(),
            resp.customer_message.clone(),
        )?;
        info!(checkout_request_id = %resp.checkout_request_id, amount, "stk push sent");
        Ok(resp)
    }

    /// Poll until the payment settles, expires or the dialog is closed.
    ///
    /// On success the completion payload is persisted before returning.
    pub async fn await_completion(&mut self) -> Result<PaymentOutcome, MwanamamaError> {
        let checkout_request_id = match (self.session.state(), self.session.checkout_request_id()) {
            (PaymentState::Processing, Some(id)) => id.to_string(),
            (state, _) => {
                return Err(MwanamamaError::Payment(format!(
                    "cannot wait for payment in state {state:?}"
                )));
            }
        };

        let cancel = self.cancel.token();
        let outcome = poll_until_settled(
            self.gateway.as_ref(),
            &checkout_request_id,
            &self.policy,
            &cancel,
        )
        .await;

        match outcome {
            PollOutcome::Succeeded(transaction) => {
                self.session.succeed(transaction.clone())?;
                let payload = CompletionPayload::new(
                    self.summary.clone(),
                    self.form.clone(),
                    checkout_request_id.clone(),
                    transaction,
                    Utc::now(),
                    self.handoff_ttl,
                );
                handoff::persist(self.storage.as_ref(), &payload)?;
                Ok(PaymentOutcome::Completed {
                    route: COMPLETION_ROUTE,
                    checkout_request_id,
                })
            }
            PollOutcome::Failed(message) => {
                self.session.fail(message.clone())?;
                Ok(PaymentOutcome::Failed { message })
            }
            PollOutcome::Expired { .. } => {
                self.session.expire()?;
                self.record_abandoned(checkout_request_id.clone())?;
                Ok(PaymentOutcome::Expired {
                    checkout_request_id,
                })
            }
            PollOutcome::Cancelled => {
                self.close()?;
                Ok(PaymentOutcome::Cancelled)
            }
        }
    }

    /// `initiate` followed by `await_completion`.
    pub async fn run(&mut self, phone: &str) -> Result<PaymentOutcome, MwanamamaError> {
        self.initiate(phone).await?;
        self.await_completion().await
    }

    /// Close the dialog: stop polling and reset to `Idle`.
    ///
    /// The gateway is not told; an attempt closed mid-flight is recorded as
    /// abandoned so a retry can warn about a possible double charge.
    pub fn close(&mut self) -> Result<(), MwanamamaError> {
        self.cancel.cancel();
        if let Some(id) = self.session.reset() {
            self.record_abandoned(id)?;
        }
        Ok(())
    }

    fn record_abandoned(&self, checkout_request_id: String) -> Result<(), MwanamamaError> {
        record_abandoned(
            self.storage.as_ref(),
            AbandonedCheckout {
                checkout_request_id,
                amount: self.summary.amount_due(),
                abandoned_at: Utc::now(),
            },
        )
    }
}
