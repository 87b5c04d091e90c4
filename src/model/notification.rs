use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Order,
    Payment,
    /// Any type this client does not render specially.
    #[serde(other)]
    Other,
}

/// A push message as it arrives from the server topic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "message", alias = "body")]
    pub content: String,
    #[serde(default, rename = "type")]
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read_timestamp: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn from_inbound(message: InboundMessage, received_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: message.title,
            content: message.content,
            kind: message.kind,
            is_read: false,
            timestamp: received_at,
            read_timestamp: None,
        }
    }

    /// Returns `true` if the notification was unread before the call.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_timestamp = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_accepts_message_alias() {
        let msg: InboundMessage =
            serde_json::from_str(r##"{"title":"Order shipped","message":"#42 is on its way","type":"order"}"##)
                .unwrap();
        assert_eq!(msg.content, "#42 is on its way");
        assert_eq!(msg.kind, NotificationKind::Order);
    }

    #[test]
    fn test_inbound_unknown_type_is_kept() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"title":"Flash sale","content":"20% off","type":"promotion"}"#)
                .unwrap();
        assert_eq!(msg.kind, NotificationKind::Other);
        assert_eq!(msg.content, "20% off");
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let now = Utc::now();
        let mut n = Notification::from_inbound(
            InboundMessage {
                title: "t".into(),
                content: "c".into(),
                kind: NotificationKind::Info,
            },
            now,
        );
        assert!(n.mark_read(now));
        let first = n.read_timestamp;
        assert!(!n.mark_read(now + chrono::Duration::hours(1)));
        assert_eq!(n.read_timestamp, first);
    }

    #[test]
    fn test_persisted_shape_is_camel_case() {
        let n = Notification::from_inbound(
            InboundMessage {
                title: "t".into(),
                content: "c".into(),
                kind: NotificationKind::Payment,
            },
            Utc::now(),
        );
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "payment");
        assert_eq!(json["isRead"], false);
        assert!(json["readTimestamp"].is_null());
    }
}
