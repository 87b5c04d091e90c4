use tracing::info;

use crate::error::MwanamamaError;
use crate::model::payment::Transaction;

/// `Idle → Processing → {Succeeded | Failed | Expired}`.
///
/// Terminal states only leave through [`PaymentSession::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentState {
    Idle,
    Processing,
    Succeeded,
    Failed,
    Expired,
}

impl PaymentState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PaymentState::Succeeded | PaymentState::Failed | PaymentState::Expired
        )
    }
}

/// In-memory state of one payment dialog.
#[derive(Debug, Clone)]
pub struct PaymentSession {
    state: PaymentState,
    phone_number: Option<String>,
    checkout_request_id: Option<String>,
    customer_message: Option<String>,
    transaction: Option<Transaction>,
    error: Option<String>,
}

impl Default for PaymentSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentSession {
    pub fn new() -> Self {
        Self {
            state: PaymentState::Idle,
            phone_number: None,
            checkout_request_id: None,
            customer_message: None,
            transaction: None,
            error: None,
        }
    }

    pub fn state(&self) -> PaymentState {
        self.state
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    pub fn checkout_request_id(&self) -> Option<&str> {
        self.checkout_request_id.as_deref()
    }

    /// The prompt text the gateway returned, e.g. "Success. Request accepted".
    pub fn customer_message(&self) -> Option<&str> {
        self.customer_message.as_deref()
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record a failed push. The session stays `Idle` so the payer can resubmit.
    pub fn record_push_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn begin_processing(
        &mut self,
        phone_number: String,
        checkout_request_id: String,
        customer_message: Option<String>,
    ) -> Result<(), MwanamamaError> {
        self.check_transition(PaymentState::Idle, PaymentState::Processing)?;
        info!(%checkout_request_id, "payment processing");
        self.state = PaymentState::Processing;
        self.phone_number = Some(phone_number);
        self.checkout_request_id = Some(checkout_request_id);
        self.customer_message = customer_message;
        self.error = None;
        Ok(())
    }

    pub fn succeed(&mut self, transaction: Transaction) -> Result<(), MwanamamaError> {
        self.check_transition(PaymentState::Processing, PaymentState::Succeeded)?;
        info!(
            checkout_request_id = ?self.checkout_request_id,
            receipt = ?transaction.mpesa_receipt_number,
            "payment succeeded"
        );
        self.state = PaymentState::Succeeded;
        self.transaction = Some(transaction);
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), MwanamamaError> {
        self.check_transition(PaymentState::Processing, PaymentState::Failed)?;
        let message = message.into();
        info!(checkout_request_id = ?self.checkout_request_id, %message, "payment failed");
        self.state = PaymentState::Failed;
        self.error = Some(message);
        Ok(())
    }

    pub fn expire(&mut self) -> Result<(), MwanamamaError> {
        self.check_transition(PaymentState::Processing, PaymentState::Expired)?;
        info!(checkout_request_id = ?self.checkout_request_id, "payment expired");
        self.state = PaymentState::Expired;
        self.error = Some("We did not receive a payment confirmation in time.".into());
        Ok(())
    }

    /// Back to `Idle`, dropping everything. Returns the checkout request id if
    /// the session was still processing, i.e. the attempt was abandoned.
    pub fn reset(&mut self) -> Option<String> {
        let abandoned = match self.state {
            PaymentState::Processing => self.checkout_request_id.clone(),
            _ => None,
        };
        *self = Self::new();
        abandoned
    }

    fn check_transition(&self, from: PaymentState, to: PaymentState) -> Result<(), MwanamamaError> {
        if self.state == from {
            Ok(())
        } else {
            Err(MwanamamaError::Payment(format!(
                "invalid payment transition {:?} -> {to:?}",
                self.state
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx() -> Transaction {
        serde_json::from_str(r#"{"mpesaReceiptNumber":"ABC123"}"#).unwrap()
    }

    fn processing() -> PaymentSession {
        let mut s = PaymentSession::new();
        s.begin_processing("254700000000".into(), "ws_1".into(), None)
            .unwrap();
        s
    }

    #[test]
    fn test_happy_path() {
        let mut s = processing();
        assert_eq!(s.state(), PaymentState::Processing);
        s.succeed(tx()).unwrap();
        assert_eq!(s.state(), PaymentState::Succeeded);
        assert!(s.state().is_terminal());
        assert_eq!(
            s.transaction().unwrap().mpesa_receipt_number.as_deref(),
            Some("ABC123")
        );
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        let mut s = processing();
        s.fail("Request cancelled by user").unwrap();
        assert!(s.succeed(tx()).is_err());
        assert!(s.fail("again").is_err());
        assert!(s.expire().is_err());
        assert_eq!(s.state(), PaymentState::Failed);
        assert_eq!(s.error(), Some("Request cancelled by user"));
    }

    #[test]
    fn test_cannot_poll_result_from_idle() {
        let mut s = PaymentSession::new();
        assert!(s.succeed(tx()).is_err());
        assert!(s.fail("x").is_err());
        assert_eq!(s.state(), PaymentState::Idle);
    }

    #[test]
    fn test_cannot_begin_twice() {
        let mut s = processing();
        assert!(
            s.begin_processing("254700000000".into(), "ws_2".into(), None)
                .is_err()
        );
        assert_eq!(s.checkout_request_id(), Some("ws_1"));
    }

    #[test]
    fn test_reset_reports_abandoned_attempt() {
        let mut s = processing();
        assert_eq!(s.reset().as_deref(), Some("ws_1"));
        assert_eq!(s.state(), PaymentState::Idle);
        assert!(s.checkout_request_id().is_none());

        let mut done = processing();
        done.succeed(tx()).unwrap();
        assert_eq!(done.reset(), None);
    }

    #[test]
    fn test_push_error_keeps_idle() {
        let mut s = PaymentSession::new();
        s.record_push_error("Network error");
        assert_eq!(s.state(), PaymentState::Idle);
        assert_eq!(s.error(), Some("Network error"));
    }
}
