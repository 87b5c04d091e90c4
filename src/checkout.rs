//! Checkout: form submission and the order placed after payment.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::cart::Cart;
use crate::client::MwanamamaClient;
use crate::error::{FieldError, MwanamamaError};
use crate::model::checkout::{BuyerKind, CheckoutFormData};
use crate::model::order::{Order, OrderSubmission, PaymentReceipt};
use crate::payment::PaymentWorkflow;
use crate::payment::handoff::{self, Redemption};
use crate::storage::Storage;

pub const HOME_ROUTE: &str = "/";
pub const ORDER_PLACED_NOTICE: &str = "Your order has been placed successfully!";
/// How long the success notice stays up before redirecting home.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// What happened when the checkout form was submitted.
pub enum Submission {
    /// Group purchase placed on the group's credit line.
    OrderPlaced(Order),
    /// Individual purchase; the caller drives the payment dialog.
    AwaitingPayment(PaymentWorkflow<MwanamamaClient>),
}

/// Why there was nothing to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReason {
    NotFound,
    Incomplete,
    Expired,
}

#[derive(Error, Debug)]
pub enum CompletionError {
    /// No usable payment payload; send the user to `redirect_to`.
    #[error("no payment to complete ({reason:?})")]
    MissingPayload {
        reason: MissingReason,
        redirect_to: &'static str,
    },

    /// The order request failed. The payload is already consumed.
    #[error(transparent)]
    Submit(#[from] MwanamamaError),
}

impl CompletionError {
    pub fn user_message(&self) -> String {
        match self {
            CompletionError::MissingPayload { .. } => {
                "No payment information found. Please start checkout again.".into()
            }
            CompletionError::Submit(e) => e.user_message(),
        }
    }
}

/// A placed order and where to go next.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub order: Order,
    pub notice: &'static str,
    pub redirect_to: &'static str,
    pub redirect_after: Duration,
}

pub struct Checkout {
    client: Arc<MwanamamaClient>,
    storage: Arc<dyn Storage>,
    cart: Cart,
}

impl Checkout {
    pub fn new(client: Arc<MwanamamaClient>, storage: Arc<dyn Storage>) -> Self {
        let cart = Cart::new(storage.clone());
        Self {
            client,
            storage,
            cart,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Validate the form and either place a group order or hand back a
    /// payment workflow for an individual buyer.
    ///
    /// Group orders rejected for exceeding the group's credit come back as an
    /// error whose [`kind`](MwanamamaError::kind) is `LoanLimit`.
    pub async fn submit(&self, form: &CheckoutFormData) -> Result<Submission, MwanamamaError> {
        form.validate()?;

        let config = self.client.config();
        let summary = self.cart.summary(&config.pricing)?;
        if summary.is_empty() {
            return Err(MwanamamaError::Validation(vec![FieldError::invalid(
                "cart", "is empty",
            )]));
        }

        match form.buyer_kind {
            BuyerKind::Group => {
                let submission = OrderSubmission::build(form, &summary, None);
                let order = self.client.place_order(&submission).await?;
                info!(order_id = order.id, group_id = ?form.group_id, "group order placed");
                self.cart.clear()?;
                Ok(Submission::OrderPlaced(order))
            }
            BuyerKind::Individual => Ok(Submission::AwaitingPayment(PaymentWorkflow::new(
                self.client.clone(),
                self.storage.clone(),
                config.poll_policy.clone(),
                config.handoff_ttl,
                summary,
                form.clone(),
            ))),
        }
    }

    /// Redeem the payment hand-off and place the paid order.
    ///
    /// Runs at most once per payload. A failed request is not retried.
    pub async fn complete_order(&self) -> Result<Placed, CompletionError> {
        self.complete_order_at(Utc::now()).await
    }

    pub async fn complete_order_at(&self, now: DateTime<Utc>) -> Result<Placed, CompletionError> {
        let payload = match handoff::redeem(self.storage.as_ref(), now)? {
            Redemption::Ready(payload) => payload,
            Redemption::Missing => return Err(nothing_to_complete(MissingReason::NotFound)),
            Redemption::Incomplete => return Err(nothing_to_complete(MissingReason::Incomplete)),
            Redemption::Expired { .. } => return Err(nothing_to_complete(MissingReason::Expired)),
        };

        let receipt = PaymentReceipt::from_transaction(&payload.checkout_request_id, &payload.transaction);
        let submission = OrderSubmission::build(&payload.form_data, &payload.order_summary, Some(receipt));

        let order = match self.client.place_order(&submission).await {
            Ok(order) => order,
            Err(e) => {
                warn!(
                    checkout_request_id = %payload.checkout_request_id,
                    error = %e,
                    "paid order was rejected"
                );
                return Err(e.into());
            }
        };

        info!(
            order_id = order.id,
            checkout_request_id = %payload.checkout_request_id,
            "paid order placed"
        );
        self.cart.clear()?;

        Ok(Placed {
            order,
            notice: ORDER_PLACED_NOTICE,
            redirect_to: HOME_ROUTE,
            redirect_after: REDIRECT_DELAY,
        })
    }
}

fn nothing_to_complete(reason: MissingReason) -> CompletionError {
    warn!(?reason, "nothing to complete, redirecting home");
    CompletionError::MissingPayload {
        reason,
        redirect_to: HOME_ROUTE,
    }
}
