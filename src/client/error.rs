use serde_json::Value;
use thiserror::Error;

/// Body of a failed HTTP response, kept for caller inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ErrorBody {
    /// Human readable message: `message`, then `error`, then the raw text.
    pub fn message(&self) -> Option<String> {
        match self {
            ErrorBody::Json(v) => ["message", "error"].iter().find_map(|k| {
                v.get(*k)
                    .and_then(|m| m.as_str())
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
            }),
            ErrorBody::Text(t) if !t.trim().is_empty() => Some(t.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        body: ErrorBody,
    },

    #[error("session expired, please log in again")]
    SessionExpired,

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("{0}")]
    Validation(String),

    #[error("session store error: {0}")]
    Store(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_prefers_message_then_error() {
        let body = ErrorBody::Json(json!({ "error": "bad", "message": "nope" }));
        assert_eq!(body.message().as_deref(), Some("nope"));
        let body = ErrorBody::Json(json!({ "error": "bad" }));
        assert_eq!(body.message().as_deref(), Some("bad"));
        let body = ErrorBody::Json(json!({ "detail": "x" }));
        assert_eq!(body.message(), None);
    }

    #[test]
    fn blank_text_has_no_message() {
        assert_eq!(ErrorBody::Text("  ".into()).message(), None);
        assert_eq!(ErrorBody::Text("gateway down".into()).message().as_deref(), Some("gateway down"));
        assert_eq!(ErrorBody::Empty.message(), None);
    }
}
