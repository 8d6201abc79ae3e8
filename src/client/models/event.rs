use crate::common::lenient::{self, Fields};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A scheduled group meal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Event {
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub restaurant_id: Option<i64>,
    pub restaurant_name: Option<String>,
    pub restaurant_address: Option<String>,
    pub creator_id: Option<i64>,
    pub creator_nickname: Option<String>,
    pub participants: Vec<Value>,
    pub participants_count: u32,
    pub max_participants: Option<u32>,
    pub created_at: Option<String>,
}

pub const UNTITLED: &str = "Untitled";

impl Event {
    pub fn from_json(v: &Value) -> Self {
        let f = Fields::new(v);
        let participants = f.list(&["participants"]);
        let participants_count = f
            .count(&["participants_count", "participantsCount", "current_participants", "currentParticipants"])
            .unwrap_or(participants.len() as u32);
        Self {
            id: f.id(&["id", "eventId", "event_id"]),
            title: f.text(&["title"]).unwrap_or_else(|| UNTITLED.to_string()),
            content: f.string(&["content"]).unwrap_or_default(),
            start_at: f.string(&["start_at", "startAt"]),
            end_at: f.string(&["end_at", "endAt"]),
            restaurant_id: f.id(&["restaurant_id", "restaurantId"]),
            restaurant_name: f.string(&["restaurant_name", "restaurantName"]),
            restaurant_address: f.string(&["restaurant_address", "restaurantAddress"]),
            creator_id: f.id(&["/creator/id", "creator_id", "creatorId"]),
            creator_nickname: f.string(&["/creator/nickname", "/creator/name"]),
            participants,
            participants_count,
            max_participants: f.count(&["max_participants", "maxParticipants"]),
            created_at: f.string(&["created_at", "createdAt"]),
        }
    }

    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        parse_instant(self.start_at.as_deref())
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        parse_instant(self.end_at.as_deref())
    }

    pub fn is_full(&self) -> bool {
        self.max_participants.map(|max| self.participants_count >= max).unwrap_or(false)
    }
}

lenient::deserialize_via_adapter!(Event);

fn parse_instant(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok()).map(|d| d.with_timezone(&Utc))
}

/// One page of the event feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventPage {
    pub items: Vec<Event>,
    pub page: u64,
    pub size: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub size: Option<u64>,
    pub user_id: Option<i64>,
}

/// Payload for creating or editing an event; absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<i64>,
    /// ISO 8601
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<String>,
    /// ISO 8601
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snake_and_camel_case_rows_normalize_alike() {
        let snake = Event::from_json(&json!({
            "id": 4, "title": "Lunch", "start_at": "2025-03-01T12:00:00Z",
            "restaurant_id": "8", "creator_id": 2, "participants_count": 3, "max_participants": 3
        }));
        let camel = Event::from_json(&json!({
            "id": "4", "title": "Lunch", "startAt": "2025-03-01T12:00:00Z",
            "restaurantId": 8, "creator": { "id": 2 }, "participantsCount": 3, "maxParticipants": 3
        }));
        assert_eq!(snake, camel);
        assert!(snake.is_full());
        assert!(snake.starts_at().is_some());
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let e = Event::from_json(&json!({ "participants": [{ "id": 1 }, { "id": 2 }] }));
        assert_eq!(e.title, UNTITLED);
        assert_eq!(e.content, "");
        assert_eq!(e.participants_count, 2);
        assert!(!e.is_full());
    }

    #[test]
    fn draft_skips_absent_fields() {
        let d = EventDraft { title: Some("t".into()), ..Default::default() };
        assert_eq!(serde_json::to_value(&d).unwrap(), json!({ "title": "t" }));
    }
}
