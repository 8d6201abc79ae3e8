use crate::common::lenient::{self, Fields};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: Option<String>,
    /// Id of the sending user.
    pub sender: Option<i64>,
    pub content: String,
    /// ISO 8601 timestamp.
    pub created_at: Option<String>,
    /// Set on messages added locally before the backend confirmed them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

const SENDER_KEYS: [&str; 5] = ["user_id", "userId", "sender_id", "senderId", "sender"];

impl ChatMessage {
    /// Reads a stored message from the REST history.
    pub fn from_json(v: &Value) -> Self {
        let f = Fields::new(v);
        Self {
            id: f.string(&["id", "message_id", "messageId"]),
            sender: f.id(&SENDER_KEYS),
            content: f.string(&["content", "message", "text"]).unwrap_or_default(),
            created_at: f.string(&["created_at", "createdAt", "timestamp"]),
            client_id: None,
        }
    }

    /// Reads a real-time frame. Frames without a timestamp are stamped now.
    pub fn from_frame(v: &Value) -> Self {
        let mut msg = Self::from_json(v);
        if msg.created_at.is_none() {
            msg.created_at = Some(now_iso());
        }
        msg
    }

    /// A frame that was not JSON, kept as plain text.
    pub fn plain_text(text: &str) -> Self {
        Self { content: text.to_string(), created_at: Some(now_iso()), ..Default::default() }
    }

    /// Locally created message shown before the server echoes it back.
    pub fn optimistic(content: &str, sender: Option<i64>) -> Self {
        Self {
            id: None,
            sender,
            content: content.to_string(),
            created_at: Some(now_iso()),
            client_id: Some(uuid::Uuid::new_v4().to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.client_id.is_some()
    }
}

lenient::deserialize_via_adapter!(ChatMessage);

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One row of the chat list: an event the user takes part in and its most
/// recent message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatPreview {
    pub chat_id: i64,
    pub title: String,
    pub last_message: Option<String>,
    pub last_at: Option<String>,
    pub participants: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frame_keys_are_absorbed() {
        let m = ChatMessage::from_frame(&json!({ "messageId": 3, "senderId": "5", "message": "hi", "createdAt": "t" }));
        assert_eq!(m.id.as_deref(), Some("3"));
        assert_eq!(m.sender, Some(5));
        assert_eq!(m.content, "hi");
        assert_eq!(m.created_at.as_deref(), Some("t"));
    }

    #[test]
    fn frames_without_timestamp_are_stamped() {
        let m = ChatMessage::from_frame(&json!({ "content": "yo" }));
        assert!(m.created_at.is_some());
        assert!(!m.is_pending());
        assert!(ChatMessage::optimistic("x", Some(1)).is_pending());
    }
}
