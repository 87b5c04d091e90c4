use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::PaymentGateway;
use crate::error::MwanamamaError;
use crate::model::payment::{PollStatus, Transaction};

/// Longest overall wait a policy may ask for.
pub const MAX_POLL_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Cadence and bounds for status polling.
///
/// The wait before poll `n` (1-based) is `initial_interval * multiplier^(n-1)`,
/// capped at `max_interval`. Polling stops after `max_attempts` queries or
/// once the next wait would cross `timeout`, whichever comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(3),
            multiplier: 1.5,
            max_interval: Duration::from_secs(15),
            max_attempts: 40,
            timeout: Duration::from_secs(180),
        }
    }
}

impl PollPolicy {
    /// A fixed interval with no growth.
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            initial_interval: interval,
            multiplier: 1.0,
            max_interval: interval,
            max_attempts,
            timeout: interval.saturating_mul(max_attempts.saturating_add(1)),
        }
    }

    pub fn validate(&self) -> Result<(), MwanamamaError> {
        if self.initial_interval.is_zero() {
            return Err(MwanamamaError::Config("poll interval must be non-zero".into()));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(MwanamamaError::Config(format!(
                "poll multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_interval < self.initial_interval {
            return Err(MwanamamaError::Config(
                "max poll interval is shorter than the initial interval".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(MwanamamaError::Config("max poll attempts must be at least 1".into()));
        }
        if self.timeout.is_zero() || self.timeout > MAX_POLL_TIMEOUT {
            return Err(MwanamamaError::Config(format!(
                "poll timeout must be between 1ms and {}s, got {:?}",
                MAX_POLL_TIMEOUT.as_secs(),
                self.timeout
            )));
        }
        if self.max_interval > self.timeout {
            return Err(MwanamamaError::Config(
                "max poll interval is longer than the poll timeout".into(),
            ));
        }
        Ok(())
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let scaled = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_interval.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_interval)
    }
}

/// How polling ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded(Transaction),
    Failed(String),
    /// Attempts or time ran out without a terminal answer.
    Expired { attempts: u32 },
    Cancelled,
}

/// Poll `checkout_request_id` until it settles, runs out, or `cancel` fires.
///
/// Queries never overlap: each tick awaits its response before the next wait
/// starts. Cancellation interrupts both the wait and an in-flight query.
pub async fn poll_until_settled<G>(
    gateway: &G,
    checkout_request_id: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> PollOutcome
where
    G: PaymentGateway + ?Sized,
{
    let deadline = Instant::now() + policy.timeout.min(MAX_POLL_TIMEOUT);

    for attempt in 1..=policy.max_attempts {
        let delay = policy.delay_for(attempt);
        if delay > deadline.saturating_duration_since(Instant::now()) {
            warn!(checkout_request_id, attempt, "payment polling timed out");
            return PollOutcome::Expired {
                attempts: attempt - 1,
            };
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            result = gateway.query(checkout_request_id) => result,
        };

        match result {
            Ok(resp) => match resp.classify() {
                PollStatus::Succeeded(tx) => return PollOutcome::Succeeded(tx),
                PollStatus::Failed(message) => return PollOutcome::Failed(message),
                PollStatus::Pending => {
                    debug!(checkout_request_id, attempt, "payment still pending");
                }
            },
            Err(e) => {
                warn!(checkout_request_id, attempt, error = %e, "payment status query failed");
                return PollOutcome::Failed(e.user_message());
            }
        }
    }

    warn!(checkout_request_id, attempts = policy.max_attempts, "payment polling exhausted attempts");
    PollOutcome::Expired {
        attempts: policy.max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::payment::testing::{Reply, ScriptedGateway};

    fn policy() -> PollPolicy {
        PollPolicy::fixed(Duration::from_secs(3), 10)
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let p = PollPolicy::default();
        assert_eq!(p.delay_for(1), Duration::from_secs(3));
        assert_eq!(p.delay_for(2), Duration::from_millis(4500));
        assert_eq!(p.delay_for(10), Duration::from_secs(15));
        assert_eq!(p.delay_for(u32::MAX), Duration::from_secs(15));
    }

    #[test]
    fn test_validate_rejects_bad_policies() {
        assert!(PollPolicy::default().validate().is_ok());
        assert!(
            PollPolicy {
                multiplier: 0.5,
                ..PollPolicy::default()
            }
            .validate()
            .is_err()
        );
        assert!(PollPolicy::fixed(Duration::ZERO, 3).validate().is_err());
        assert!(PollPolicy::fixed(Duration::from_secs(1), 0).validate().is_err());
    }

    #[test]
    fn test_validate_bounds_timeout() {
        for timeout in [Duration::ZERO, Duration::MAX, MAX_POLL_TIMEOUT + Duration::from_secs(1)] {
            let policy = PollPolicy {
                timeout,
                ..PollPolicy::default()
            };
            assert!(policy.validate().is_err(), "{timeout:?}");
        }
        assert!(
            PollPolicy {
                max_interval: Duration::from_secs(600),
                ..PollPolicy::default()
            }
            .validate()
            .is_err()
        );
        assert_eq!(
            PollPolicy {
                max_interval: Duration::MAX,
                multiplier: f64::MAX,
                ..PollPolicy::default()
            }
            .delay_for(3),
            Duration::MAX
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unvalidated_huge_timeout_does_not_overflow() {
        let gateway = ScriptedGateway::new(vec![Reply::Json(
            r#"{"ResultCode":0,"transaction":{"mpesaReceiptNumber":"ABC123"}}"#,
        )]);
        let policy = PollPolicy {
            timeout: Duration::MAX,
            ..PollPolicy::default()
        };

        let outcome = poll_until_settled(&gateway, "ws_1", &policy, &CancellationToken::new()).await;
        assert!(matches!(outcome, PollOutcome::Succeeded(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_pending() {
        let gateway = ScriptedGateway::new(vec![
            Reply::Json(r#"{"status":"PENDING"}"#),
            Reply::Json(r#"{"status":"PENDING"}"#),
            Reply::Json(r#"{"ResultCode":0,"transaction":{"mpesaReceiptNumber":"ABC123","amount":"500"}}"#),
        ]);
        let start = Instant::now();

        let outcome =
            poll_until_settled(&gateway, "ws_1234", &policy(), &CancellationToken::new()).await;

        let PollOutcome::Succeeded(tx) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(tx.mpesa_receipt_number.as_deref(), Some("ABC123"));
        assert_eq!(gateway.queries(), 3);
        assert!(start.elapsed() >= Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_stops_polling() {
        let gateway = ScriptedGateway::new(vec![
            Reply::Json(r#"{"status":"PENDING"}"#),
            Reply::Json(r#"{"ResultCode":1032,"ResultDesc":"Request cancelled by user"}"#),
            Reply::Json(r#"{"status":"PENDING"}"#),
        ]);

        let outcome = poll_until_settled(&gateway, "ws_1", &policy(), &CancellationToken::new()).await;
        assert_eq!(outcome, PollOutcome::Failed("Request cancelled by user".into()));
        assert_eq!(gateway.queries(), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(gateway.queries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_error_is_failure() {
        let gateway = ScriptedGateway::new(vec![Reply::Status(500, "upstream down")]);

        let outcome = poll_until_settled(&gateway, "ws_1", &policy(), &CancellationToken::new()).await;
        assert_eq!(outcome, PollOutcome::Failed("upstream down".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_max_attempts() {
        let gateway = ScriptedGateway::always_pending();

        let outcome = poll_until_settled(
            &gateway,
            "ws_1",
            &PollPolicy::fixed(Duration::from_secs(3), 4),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(outcome, PollOutcome::Expired { attempts: 4 });
        assert_eq!(gateway.queries(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_at_timeout() {
        let gateway = ScriptedGateway::always_pending();
        let policy = PollPolicy {
            timeout: Duration::from_secs(10),
            ..PollPolicy::fixed(Duration::from_secs(3), 100)
        };

        let outcome = poll_until_settled(&gateway, "ws_1", &policy, &CancellationToken::new()).await;
        assert_eq!(outcome, PollOutcome::Expired { attempts: 3 });
        assert_eq!(gateway.queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_further_queries() {
        let gateway = Arc::new(ScriptedGateway::always_pending());
        let cancel = CancellationToken::new();

        let task = {
            let gateway = Arc::clone(&gateway);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                poll_until_settled(gateway.as_ref(), "ws_1", &policy(), &cancel).await
            })
        };

        tokio::time::sleep(Duration::from_millis(7_500)).await;
        assert_eq!(gateway.queries(), 2);
        cancel.cancel();

        assert_eq!(task.await.unwrap(), PollOutcome::Cancelled);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(gateway.queries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_in_flight_query() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Reply::Hang]));
        let cancel = CancellationToken::new();

        let task = {
            let gateway = Arc::clone(&gateway);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                poll_until_settled(gateway.as_ref(), "ws_1", &policy(), &cancel).await
            })
        };

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(gateway.queries(), 1);
        cancel.cancel();
        assert_eq!(task.await.unwrap(), PollOutcome::Cancelled);
    }
}
