use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::store::NotificationStore;
use crate::model::notification::InboundMessage;

/// Counters for one feed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub received: usize,
    pub delivered: usize,
    pub suppressed: usize,
    pub malformed: usize,
}

/// Consume JSON frames from the live push connection until it closes or
/// `cancel` fires.
///
/// The socket itself lives outside this crate; whatever owns it forwards each
/// text frame into `frames`.
pub async fn run_feed(
    store: Arc<NotificationStore>,
    mut frames: mpsc::Receiver<String>,
    cancel: CancellationToken,
) -> FeedStats {
    let mut stats = FeedStats::default();

    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("notification feed cancelled");
                break;
            }
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => {
                    debug!("notification feed closed");
                    break;
                }
            },
        };
        stats.received += 1;

        let message: InboundMessage = match serde_json::from_str(&frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "skipping malformed notification frame");
                stats.malformed += 1;
                continue;
            }
        };

        match store.ingest(message) {
            Ok(Some(_)) => stats.delivered += 1,
            Ok(None) => stats.suppressed += 1,
            Err(e) => warn!(error = %e, "failed to store notification"),
        }
    }

    info!(
        received = stats.received,
        delivered = stats.delivered,
        suppressed = stats.suppressed,
        malformed = stats.malformed,
        "notification feed stopped"
    );
    stats
}
