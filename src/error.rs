use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MwanamamaError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: status={status}, message={message}")]
    Api { status: u16, message: String },

    #[error("validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payment error: {0}")]
    Payment(String),
}

/// Coarse classification used by callers to pick how a failure is shown:
/// inline field errors, a retry toast, a blocking dialog, or the payment panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Business,
    LoanLimit,
    PaymentFailed,
    Internal,
}

impl MwanamamaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MwanamamaError::Validation(_) => ErrorKind::Validation,
            MwanamamaError::Http(_) => ErrorKind::Transport,
            MwanamamaError::Api { message, .. } if is_loan_limit_message(message) => {
                ErrorKind::LoanLimit
            }
            MwanamamaError::Api { status, .. } if *status >= 500 => ErrorKind::Transport,
            MwanamamaError::Api { .. } => ErrorKind::Business,
            MwanamamaError::Payment(_) => ErrorKind::PaymentFailed,
            MwanamamaError::Serialize(_)
            | MwanamamaError::Config(_)
            | MwanamamaError::Storage(_)
            | MwanamamaError::Io(_) => ErrorKind::Internal,
        }
    }

    /// Message suitable for a toast or dialog body.
    pub fn user_message(&self) -> String {
        match self {
            MwanamamaError::Api { message, .. } => message.clone(),
            MwanamamaError::Payment(message) => message.clone(),
            MwanamamaError::Http(_) => "Network error, please check your connection and try again".into(),
            other => other.to_string(),
        }
    }
}

fn is_loan_limit_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("loan limit") || lower.contains("limit reached")
}

/// A required checkout field that was left empty or is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub issue: String,
}

impl FieldError {
    pub fn required(field: &'static str) -> Self {
        Self {
            field,
            issue: "is required".into(),
        }
    }

    pub fn invalid(field: &'static str, issue: impl Into<String>) -> Self {
        Self {
            field,
            issue: issue.into(),
        }
    }
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{} {}", f.field, f.issue))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error bodies from the backend come as `{message}`, `{error}` or both.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorResponse {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}
