//! M-Pesa STK-push checkout.
//!
//! [`workflow::PaymentWorkflow`] drives one payment attempt: push the prompt,
//! poll the gateway until the payer settles, then leave a
//! [`handoff::CompletionPayload`] in durable storage for the page that
//! submits the order.

pub mod handoff;
pub mod poller;
pub mod session;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::client::MwanamamaClient;
use crate::error::MwanamamaError;
use crate::model::payment::{StkPushRequest, StkPushResponse, TransactionQueryResponse};

pub use handoff::{CompletionPayload, Redemption};
pub use poller::{PollOutcome, PollPolicy};
pub use session::{PaymentSession, PaymentState};
pub use workflow::{COMPLETION_ROUTE, CancelHandle, PaymentOutcome, PaymentWorkflow};

/// The two gateway calls a payment attempt needs.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn push(&self, req: &StkPushRequest) -> Result<StkPushResponse, MwanamamaError>;

    async fn query(
        &self,
        checkout_request_id: &str,
    ) -> Result<TransactionQueryResponse, MwanamamaError>;
}

#[async_trait]
impl PaymentGateway for MwanamamaClient {
    async fn push(&self, req: &StkPushRequest) -> Result<StkPushResponse, MwanamamaError> {
        self.stk_push(req).await
    }

    async fn query(
        &self,
        checkout_request_id: &str,
    ) -> Result<TransactionQueryResponse, MwanamamaError> {
        self.query_transaction(checkout_request_id).await
    }
}
