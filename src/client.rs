use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::envelope::{normalize_list, normalize_one};
use crate::error::{ApiErrorResponse, MwanamamaError};

pub struct MwanamamaClient {
    pub(crate) config: ClientConfig,
    pub(crate) http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
}

impl MwanamamaClient {
    /// Create a client. No network traffic happens until the first call.
    pub fn new(
        config: ClientConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, MwanamamaError> {
        let http = match config.http_client.clone() {
            Some(http) => http,
            None => reqwest::Client::builder()
                .timeout(config.timeout)
                .user_agent(config.user_agent.clone())
                .build()?,
        };

        Ok(Self {
            config,
            http,
            tokens,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Send a GET and deserialize a single object (unwrapping `{data: ...}`).
    pub(crate) async fn get<Resp>(&self, path: &str) -> Result<Resp, MwanamamaError>
    where
        Resp: DeserializeOwned,
    {
        let body = self.send(Method::GET, path, None).await?;
        normalize_one(&body)
    }

    /// Send a GET to a list endpoint, whatever envelope it answers with.
    pub(crate) async fn get_list<Item>(&self, path: &str) -> Result<Vec<Item>, MwanamamaError>
    where
        Item: DeserializeOwned,
    {
        let body = self.send(Method::GET, path, None).await?;
        normalize_list(&body)
    }

    pub(crate) async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, MwanamamaError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body_str = serde_json::to_string(body)?;
        let resp = self.send(Method::POST, path, Some(body_str)).await?;
        normalize_one(&resp)
    }

    /// POST whose response body is irrelevant (or empty).
    pub(crate) async fn post_no_content<Req>(&self, path: &str, body: &Req) -> Result<(), MwanamamaError>
    where
        Req: Serialize + ?Sized,
    {
        let body_str = serde_json::to_string(body)?;
        self.send(Method::POST, path, Some(body_str)).await?;
        Ok(())
    }

    pub(crate) async fn put<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, MwanamamaError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body_str = serde_json::to_string(body)?;
        let resp = self.send(Method::PUT, path, Some(body_str)).await?;
        normalize_one(&resp)
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), MwanamamaError> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<String, MwanamamaError> {
        let full_url = format!("{}{path}", self.config.base_url);
        debug!(%method, path, "sending request");

        let mut req = self
            .http
            .request(method.clone(), &full_url)
            .header("Accept", "application/json");

        if let Some(token) = self.tokens.bearer_token().await? {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.header("Content-Type", "application/json").body(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(%method, path, status = status.as_u16(), "received response");

        if !status.is_success() {
            return Err(parse_api_error(status.as_u16(), &text));
        }

        Ok(text)
    }
}

fn parse_api_error(status: u16, body: &str) -> MwanamamaError {
    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(ApiErrorResponse::into_message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("request failed with status {status}")
            } else {
                body.to_string()
            }
        });
    MwanamamaError::Api { status, message }
}

/// RFC 3986 unreserved characters pass through; everything else is escaped.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a string so it is safe to use in a URL path segment or query value.
pub(crate) fn encode_path_segment(s: &str) -> String {
    utf8_percent_encode(s, SEGMENT).to_string()
}
