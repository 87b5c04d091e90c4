use std::time::Duration;

use crate::error::MwanamamaError;
use crate::model::cart::PricingPolicy;
use crate::payment::poller::PollPolicy;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("mwanamama-client/", env!("CARGO_PKG_VERSION"));
const DEFAULT_HANDOFF_TTL: Duration = Duration::from_secs(15 * 60);

pub struct ClientConfig {
    pub base_url: String,
    pub http_client: Option<reqwest::Client>,
    pub timeout: Duration,
    pub user_agent: String,
    pub poll_policy: PollPolicy,
    pub pricing: PricingPolicy,
    /// How long a persisted payment-completion payload stays redeemable.
    pub handoff_ttl: Duration,
}

pub struct ClientConfigBuilder {
    base_url: Option<String>,
    http_client: Option<reqwest::Client>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    poll_policy: Option<PollPolicy>,
    pricing: Option<PricingPolicy>,
    handoff_ttl: Option<Duration>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            base_url: None,
            http_client: None,
            timeout: None,
            user_agent: None,
            poll_policy: None,
            pricing: None,
            handoff_ttl: None,
        }
    }

    /// Build a config from `MWANAMAMA_*` environment variables.
    ///
    /// `MWANAMAMA_API_URL` is required; `MWANAMAMA_HTTP_TIMEOUT_SECS`,
    /// `MWANAMAMA_POLL_INTERVAL_MS` and `MWANAMAMA_POLL_MAX_ATTEMPTS` are
    /// optional overrides.
    pub fn from_env() -> Result<Self, MwanamamaError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, MwanamamaError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(url) = lookup("MWANAMAMA_API_URL") {
            builder = builder.base_url(url);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "MWANAMAMA_HTTP_TIMEOUT_SECS")? {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let mut policy = PollPolicy::default();
        if let Some(ms) = parse_var::<u64>(&lookup, "MWANAMAMA_POLL_INTERVAL_MS")? {
            policy.initial_interval = Duration::from_millis(ms);
            policy.max_interval = policy.max_interval.max(policy.initial_interval);
            policy.timeout = policy.timeout.max(policy.max_interval);
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "MWANAMAMA_POLL_MAX_ATTEMPTS")? {
            policy.max_attempts = attempts;
        }

        builder.poll_policy(policy).build()
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, MwanamamaError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| MwanamamaError::Config(format!("{key} is not a valid number: {raw}"))),
        None => Ok(None),
    }
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = Some(policy);
        self
    }

    pub fn pricing(mut self, pricing: PricingPolicy) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn handoff_ttl(mut self, ttl: Duration) -> Self {
        self.handoff_ttl = Some(ttl);
        self
    }

    pub fn build(self) -> Result<ClientConfig, MwanamamaError> {
        let base_url = self
            .base_url
            .ok_or_else(|| MwanamamaError::Config("base_url is required".into()))?;
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(MwanamamaError::Config(format!(
                "base_url must start with http:// or https://, got {base_url:?}"
            )));
        }

        let poll_policy = self.poll_policy.unwrap_or_default();
        poll_policy.validate()?;

        let handoff_ttl = self.handoff_ttl.unwrap_or(DEFAULT_HANDOFF_TTL);
        if handoff_ttl.is_zero() {
            return Err(MwanamamaError::Config("handoff_ttl must be non-zero".into()));
        }

        Ok(ClientConfig {
            base_url,
            http_client: self.http_client,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            poll_policy,
            pricing: self.pricing.unwrap_or_default(),
            handoff_ttl,
        })
    }
}
