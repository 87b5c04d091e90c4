use crate::client::{MwanamamaClient, encode_path_segment};
use crate::error::MwanamamaError;
use crate::model::payment::{StkPushRequest, StkPushResponse, TransactionQueryResponse};

impl MwanamamaClient {
    /// Send an STK push prompt to the payer's phone.
    ///
    /// POST /pesa/stk/push
    pub async fn stk_push(&self, req: &StkPushRequest) -> Result<StkPushResponse, MwanamamaError> {
        let resp: StkPushResponse = self.post("/pesa/stk/push", req).await?;
        if resp.checkout_request_id.trim().is_empty() {
            return Err(MwanamamaError::Payment(
                "gateway did not return a checkout request id".into(),
            ));
        }
        Ok(resp)
    }

    /// Query the outcome of a push by its checkout request id.
    ///
    /// GET /pesa/transaction/query?checkoutRequestId={id}
    pub async fn query_transaction(
        &self,
        checkout_request_id: &str,
    ) -> Result<TransactionQueryResponse, MwanamamaError> {
        let path = format!(
            "/pesa/transaction/query?checkoutRequestId={}",
            encode_path_segment(checkout_request_id)
        );
        self.get(&path).await
    }
}
