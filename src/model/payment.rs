use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /pesa/stk/push`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushRequest {
    pub phone_number: String,
    /// Whole shillings.
    pub amount: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "CheckoutRequestID", alias = "checkoutRequestId")]
    pub checkout_request_id: String,
    #[serde(rename = "CustomerMessage", alias = "customerMessage", default)]
    pub customer_message: Option<String>,
    #[serde(rename = "MerchantRequestID", alias = "merchantRequestId", default)]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "ResponseCode", alias = "responseCode", default)]
    pub response_code: Option<ResultCode>,
}

/// Body of `GET /pesa/transaction/query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionQueryResponse {
    #[serde(rename = "ResultCode", alias = "resultCode", default)]
    pub result_code: Option<ResultCode>,
    #[serde(rename = "ResultDesc", alias = "resultDesc", default)]
    pub result_desc: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub transaction: Option<Transaction>,
}

/// Daraja result codes arrive as numbers or numeric strings depending on the
/// code path that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultCode(pub i64);

impl ResultCode {
    pub const SUCCESS: ResultCode = ResultCode(0);
    /// "The transaction is being processed".
    pub const IN_PROGRESS: ResultCode = ResultCode(4999);
}

impl<'de> Deserialize<'de> for ResultCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(code) => Ok(ResultCode(code)),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(ResultCode)
                .map_err(|_| serde::de::Error::custom(format!("non-numeric result code: {text}"))),
        }
    }
}

/// The settled M-Pesa transaction as recorded by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, alias = "MpesaReceiptNumber", skip_serializing_if = "Option::is_none")]
    pub mpesa_receipt_number: Option<String>,
    #[serde(default, alias = "Amount", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Value>,
    #[serde(default, alias = "PhoneNumber", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<Value>,
    #[serde(default, alias = "TransactionDate", skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    fn value_as_string(value: &Option<Value>) -> Option<String> {
        match value {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn amount_text(&self) -> Option<String> {
        Self::value_as_string(&self.amount)
    }

    pub fn phone_text(&self) -> Option<String> {
        Self::value_as_string(&self.phone_number)
    }

    pub fn date_text(&self) -> Option<String> {
        Self::value_as_string(&self.transaction_date)
    }
}

/// What one status query says about the payment.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    Succeeded(Transaction),
    Pending,
    Failed(String),
}

pub const GENERIC_PAYMENT_FAILURE: &str = "Payment failed. Please try again.";

impl TransactionQueryResponse {
    /// Classify a 2xx query response.
    ///
    /// A zero result code without a transaction record is still pending: the
    /// callback that stores the transaction has not landed yet.
    pub fn classify(self) -> PollStatus {
        let pending_status = self
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("pending"));

        match (self.result_code, self.transaction) {
            (Some(ResultCode::SUCCESS), Some(tx)) => PollStatus::Succeeded(tx),
            _ if pending_status => PollStatus::Pending,
            (None, _) | (Some(ResultCode::SUCCESS), None) | (Some(ResultCode::IN_PROGRESS), _) => {
                PollStatus::Pending
            }
            (Some(_), _) => PollStatus::Failed(
                self.result_desc
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_PAYMENT_FAILURE.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(json: &str) -> TransactionQueryResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_push_response_fields() {
        let resp: StkPushResponse = serde_json::from_str(
            r#"{"MerchantRequestID":"m-1","CheckoutRequestID":"ws_1234","ResponseCode":"0","CustomerMessage":"Success. Request accepted for processing"}"#,
        )
        .unwrap();
        assert_eq!(resp.checkout_request_id, "ws_1234");
        assert_eq!(resp.response_code, Some(ResultCode(0)));
        assert!(resp.customer_message.unwrap().starts_with("Success"));
    }

    #[test]
    fn test_success_requires_transaction() {
        let status = query(
            r#"{"ResultCode":0,"transaction":{"mpesaReceiptNumber":"ABC123","amount":"500"}}"#,
        )
        .classify();
        let PollStatus::Succeeded(tx) = status else {
            panic!("expected success, got {status:?}");
        };
        assert_eq!(tx.mpesa_receipt_number.as_deref(), Some("ABC123"));
        assert_eq!(tx.amount_text().as_deref(), Some("500"));

        assert_eq!(query(r#"{"ResultCode":"0"}"#).classify(), PollStatus::Pending);
    }

    #[test]
    fn test_pending_indicators() {
        assert_eq!(query(r#"{"status":"PENDING"}"#).classify(), PollStatus::Pending);
        assert_eq!(
            query(r#"{"ResultCode":"1032","status":"pending"}"#).classify(),
            PollStatus::Pending
        );
        assert_eq!(query(r#"{"ResultCode":4999}"#).classify(), PollStatus::Pending);
        assert_eq!(query("{}").classify(), PollStatus::Pending);
    }

    #[test]
    fn test_failure_uses_gateway_description() {
        assert_eq!(
            query(r#"{"ResultCode":1032,"ResultDesc":"Request cancelled by user"}"#).classify(),
            PollStatus::Failed("Request cancelled by user".into())
        );
        assert_eq!(
            query(r#"{"ResultCode":"1","ResultDesc":""}"#).classify(),
            PollStatus::Failed(GENERIC_PAYMENT_FAILURE.into())
        );
    }

    #[test]
    fn test_transaction_keeps_unknown_fields() {
        let tx: Transaction = serde_json::from_str(
            r#"{"MpesaReceiptNumber":"QK1","Amount":500,"PhoneNumber":254700000000,"Balance":""}"#,
        )
        .unwrap();
        assert_eq!(tx.mpesa_receipt_number.as_deref(), Some("QK1"));
        assert_eq!(tx.amount_text().as_deref(), Some("500"));
        assert_eq!(tx.phone_text().as_deref(), Some("254700000000"));
        assert!(tx.extra.contains_key("Balance"));
    }
}
