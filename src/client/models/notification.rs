use crate::common::lenient::{self, Fields};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Notification {
    pub id: Option<String>,
    pub kind: Option<String>,
    pub title: String,
    pub message: String,
    pub event_id: Option<String>,
    pub created_at: Option<String>,
    pub read: bool,
}

impl Notification {
    pub fn from_json(v: &Value) -> Self {
        let f = Fields::new(v);
        Self {
            id: f.string(&["id", "notificationId", "notification_id"]),
            kind: f.string(&["type", "kind"]),
            title: f.string(&["title"]).unwrap_or_default(),
            message: f.string(&["message", "content", "body"]).unwrap_or_default(),
            event_id: f.string(&["event_id", "eventId"]),
            created_at: f.string(&["created_at", "createdAt"]),
            read: f.flag(&["read", "isRead", "is_read"]),
        }
    }
}

lenient::deserialize_via_adapter!(Notification);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationQuery {
    pub unread_only: Option<bool>,
    pub kind: Option<String>,
    pub page: Option<u64>,
    pub size: Option<u64>,
}

/// Body of `POST /api/notification`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub event_id: String,
    pub participant_ids: Vec<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_data: Option<Value>,
}
