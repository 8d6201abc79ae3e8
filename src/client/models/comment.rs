use crate::common::lenient::{self, Fields};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Comment {
    pub id: Option<i64>,
    pub event_id: Option<i64>,
    pub creator_id: Option<i64>,
    pub creator_nickname: Option<String>,
    pub content: String,
    pub created_at: Option<String>,
}

impl Comment {
    pub fn from_json(v: &Value) -> Self {
        let f = Fields::new(v);
        Self {
            id: f.id(&["id", "commentId", "comment_id"]),
            event_id: f.id(&["event_id", "eventId"]),
            creator_id: f.id(&["creator_id", "creatorId", "/creator/id", "user_id", "userId"]),
            creator_nickname: f.string(&["/creator/nickname", "/creator/name", "nickname"]),
            content: f.string(&["content", "text"]).unwrap_or_default(),
            created_at: f.string(&["created_at", "createdAt"]),
        }
    }
}

lenient::deserialize_via_adapter!(Comment);
