use crate::common::lenient::{self, Fields};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewKind {
    Received,
    Written,
}

impl ReviewKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewKind::Received => "received",
            ReviewKind::Written => "written",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Review {
    pub id: Option<i64>,
    pub event_id: Option<i64>,
    pub reviewer_id: Option<i64>,
    pub reviewee_id: Option<i64>,
    pub score: Option<i64>,
    pub comment: Option<String>,
    pub created_at: Option<String>,
}

impl Review {
    pub fn from_json(v: &Value) -> Self {
        let f = Fields::new(v);
        Self {
            id: f.id(&["id", "reviewId", "review_id"]),
            event_id: f.id(&["event_id", "eventId"]),
            reviewer_id: f.id(&["reviewer_id", "reviewerId", "/reviewer/id"]),
            reviewee_id: f.id(&["reviewee_id", "revieweeId", "/reviewee/id"]),
            score: f.id(&["score", "rating"]),
            comment: f.string(&["comment", "content"]),
            created_at: f.string(&["created_at", "createdAt"]),
        }
    }
}

lenient::deserialize_via_adapter!(Review);

/// Body of `POST /api/reviews/{userId}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub event_id: i64,
}
