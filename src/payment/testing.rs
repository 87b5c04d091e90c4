use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::PaymentGateway;
use crate::error::MwanamamaError;
use crate::model::payment::{StkPushRequest, StkPushResponse, TransactionQueryResponse};

/// One scripted answer to a status query.
pub(crate) enum Reply {
    Json(&'static str),
    Status(u16, &'static str),
    /// Never answers.
    Hang,
}

/// A gateway that answers pushes with a fixed id and queries from a script.
/// Once the script runs out every query answers `PENDING`.
pub(crate) struct ScriptedGateway {
    checkout_request_id: Option<&'static str>,
    replies: Mutex<VecDeque<Reply>>,
    pushes: Mutex<Vec<StkPushRequest>>,
    queries: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            checkout_request_id: Some("ws_1234"),
            replies: Mutex::new(replies.into()),
            pushes: Mutex::new(Vec::new()),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn always_pending() -> Self {
        Self::new(Vec::new())
    }

    /// Pushes are rejected by the gateway.
    pub fn rejecting_push() -> Self {
        Self {
            checkout_request_id: None,
            ..Self::new(Vec::new())
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn pushes(&self) -> Vec<StkPushRequest> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn push(&self, req: &StkPushRequest) -> Result<StkPushResponse, MwanamamaError> {
        self.pushes.lock().unwrap().push(req.clone());
        match self.checkout_request_id {
            Some(id) => Ok(StkPushResponse {
                checkout_request_id: id.to_string(),
                customer_message: Some("Success. Request accepted for processing".into()),
                merchant_request_id: None,
                response_code: None,
            }),
            None => Err(MwanamamaError::Api {
                status: 400,
                message: "Invalid PhoneNumber".into(),
            }),
        }
    }

    async fn query(
        &self,
        _checkout_request_id: &str,
    ) -> Result<TransactionQueryResponse, MwanamamaError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Json(body)) => Ok(serde_json::from_str(body)?),
            Some(Reply::Status(status, message)) => Err(MwanamamaError::Api {
                status,
                message: message.to_string(),
            }),
            Some(Reply::Hang) => std::future::pending().await,
            None => Ok(TransactionQueryResponse {
                status: Some("PENDING".into()),
                ..TransactionQueryResponse::default()
            }),
        }
    }
}
