use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::store::NotificationStore;
use crate::error::MwanamamaError;

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
        }
    }
}

/// Periodically purges old read notifications.
///
/// The first sweep runs as soon as the task starts.
pub struct NotificationSweeper {
    store: Arc<NotificationStore>,
    config: SweeperConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl NotificationSweeper {
    pub fn new(store: Arc<NotificationStore>, config: SweeperConfig) -> Self {
        Self {
            store,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the sweeper is already running.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), MwanamamaError> {
        if self.is_running().await {
            return Err(MwanamamaError::Config(
                "notification sweeper already running".into(),
            ));
        }

        // Fresh token so a stopped sweeper can be restarted.
        self.cancellation_token = CancellationToken::new();
        let store = Arc::clone(&self.store);
        let interval = self.config.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::sweep_loop(store, interval, cancel).await;
        });
        *self.task_handle.lock().await = Some(handle);

        info!(interval_secs = interval.as_secs(), "notification sweeper started");
        Ok(())
    }

    /// Cancel the background task and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the sweeper is not running or does not stop in time.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), MwanamamaError> {
        if !self.is_running().await {
            return Err(MwanamamaError::Config("notification sweeper not running".into()));
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            match tokio::time::timeout(STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "notification sweeper task panicked");
                    return Err(MwanamamaError::Storage(format!("sweeper task failed: {e}")));
                }
                Err(_) => {
                    warn!("notification sweeper did not stop within timeout");
                    return Err(MwanamamaError::Storage(
                        "sweeper did not stop within timeout".into(),
                    ));
                }
            }
        }

        info!("notification sweeper stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        let guard = self.task_handle.lock().await;
        guard.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Run one sweep immediately.
    pub fn sweep_once(&self) -> Result<usize, MwanamamaError> {
        self.store.sweep()
    }

    async fn sweep_loop(store: Arc<NotificationStore>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("notification sweep loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    match store.sweep() {
                        Ok(removed) => debug!(removed, "periodic notification sweep completed"),
                        Err(e) => warn!(error = %e, "periodic notification sweep failed"),
                    }
                }
            }
        }
    }
}

impl Drop for NotificationSweeper {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
