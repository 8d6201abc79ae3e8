use crate::common::lenient::{self, Fields};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything the client persists between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "authToken", alias = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// User object exactly as the backend returned it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    #[serde(rename = "isLoggedIn", default)]
    pub logged_in: bool,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user.is_none() && !self.logged_in
    }

    pub fn user_view(&self) -> Option<SessionUser> {
        self.user.as_ref().map(SessionUser::from_json)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_view().and_then(|u| u.id)
    }
}

/// Typed view over the stored user object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionUser {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub grade: Option<u32>,
    pub gender: Option<String>,
    pub is_completed: bool,
}

impl SessionUser {
    pub fn from_json(v: &Value) -> Self {
        let f = Fields::new(v);
        Self {
            id: f.id(&["id", "userId", "user_id"]),
            email: f.string(&["email"]),
            nickname: f.string(&["nickname", "name"]),
            grade: f.count(&["grade"]),
            gender: f.string(&["gender"]),
            is_completed: f.flag(&["isCompleted", "is_completed"]),
        }
    }
}

lenient::deserialize_via_adapter!(SessionUser);
