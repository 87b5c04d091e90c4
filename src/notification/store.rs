use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::MwanamamaError;
use crate::model::notification::{InboundMessage, Notification};
use crate::storage::{Storage, StorageExt, keys, poisoned};

/// Identical messages arriving closer together than this are dropped.
pub const DEDUP_WINDOW: Duration = Duration::milliseconds(500);
/// Read notifications are kept this long after being read.
pub const READ_RETENTION: Duration = Duration::hours(24);

struct State {
    items: Vec<Notification>,
    /// Content hash -> arrival time of the last delivered copy.
    recent: HashMap<String, DateTime<Utc>>,
}

/// Notifications, newest first, persisted after every change.
pub struct NotificationStore {
    storage: Arc<dyn Storage>,
    state: Mutex<State>,
}

impl NotificationStore {
    /// Load whatever was saved. An unreadable document starts the list afresh.
    pub fn load(storage: Arc<dyn Storage>) -> Result<Self, MwanamamaError> {
        let items = match storage.get_json::<Vec<Notification>>(keys::NOTIFICATIONS) {
            Ok(items) => items.unwrap_or_default(),
            Err(MwanamamaError::Serialize(e)) => {
                warn!(error = %e, "discarding unreadable notifications");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        debug!(count = items.len(), "notifications loaded");

        Ok(Self {
            storage,
            state: Mutex::new(State {
                items,
                recent: HashMap::new(),
            }),
        })
    }

    pub fn ingest(&self, message: InboundMessage) -> Result<Option<Notification>, MwanamamaError> {
        self.ingest_at(message, Utc::now())
    }

    /// Store a pushed message unless an identical one arrived within
    /// [`DEDUP_WINDOW`]. Returns the stored notification, or `None` if it was
    /// suppressed.
    pub fn ingest_at(
        &self,
        message: InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, MwanamamaError> {
        let hash = content_hash(&message.title, &message.content);
        let mut state = self.state.lock().map_err(poisoned)?;

        state.recent.retain(|_, at| now - *at < DEDUP_WINDOW);
        if state.recent.contains_key(&hash) {
            debug!(title = %message.title, "duplicate notification suppressed");
            return Ok(None);
        }
        state.recent.insert(hash, now);

        let notification = Notification::from_inbound(message, now);
        state.items.insert(0, notification.clone());
        self.persist(&state.items)?;
        info!(id = %notification.id, kind = ?notification.kind, "notification received");
        Ok(Some(notification))
    }

    pub fn list(&self) -> Result<Vec<Notification>, MwanamamaError> {
        Ok(self.state.lock().map_err(poisoned)?.items.clone())
    }

    pub fn unread_count(&self) -> Result<usize, MwanamamaError> {
        let state = self.state.lock().map_err(poisoned)?;
        Ok(state.items.iter().filter(|n| !n.is_read).count())
    }

    /// Returns `false` if no such notification exists.
    pub fn mark_read(&self, id: &str) -> Result<bool, MwanamamaError> {
        let mut state = self.state.lock().map_err(poisoned)?;
        let now = Utc::now();
        let Some(notification) = state.items.iter_mut().find(|n| n.id == id) else {
            return Ok(false);
        };
        if notification.mark_read(now) {
            self.persist(&state.items)?;
        }
        Ok(true)
    }

    /// Returns how many were newly marked.
    pub fn mark_all_read(&self) -> Result<usize, MwanamamaError> {
        let mut state = self.state.lock().map_err(poisoned)?;
        let now = Utc::now();
        let changed = state
            .items
            .iter_mut()
            .map(|n| n.mark_read(now))
            .filter(|changed| *changed)
            .count();
        if changed > 0 {
            self.persist(&state.items)?;
        }
        Ok(changed)
    }

    pub fn remove(&self, id: &str) -> Result<bool, MwanamamaError> {
        let mut state = self.state.lock().map_err(poisoned)?;
        let before = state.items.len();
        state.items.retain(|n| n.id != id);
        if state.items.len() == before {
            return Ok(false);
        }
        self.persist(&state.items)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), MwanamamaError> {
        let mut state = self.state.lock().map_err(poisoned)?;
        state.items.clear();
        self.persist(&state.items)
    }

    pub fn sweep(&self) -> Result<usize, MwanamamaError> {
        self.sweep_at(Utc::now())
    }

    /// Drop read notifications read more than [`READ_RETENTION`] before `now`.
    /// Unread notifications are never swept. Returns how many were removed.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> Result<usize, MwanamamaError> {
        let mut state = self.state.lock().map_err(poisoned)?;
        let before = state.items.len();
        state.items.retain(|n| {
            if !n.is_read {
                return true;
            }
            // Older records were saved without a read time.
            let read_at = n.read_timestamp.unwrap_or(n.timestamp);
            now - read_at <= READ_RETENTION
        });

        let removed = before - state.items.len();
        if removed > 0 {
            self.persist(&state.items)?;
            info!(removed, remaining = state.items.len(), "old notifications swept");
        }
        Ok(removed)
    }

    fn persist(&self, items: &[Notification]) -> Result<(), MwanamamaError> {
        self.storage.set_json(keys::NOTIFICATIONS, items)
    }
}

fn content_hash(title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
