use crate::client::error::ApiResult;
use crate::client::models::comment::Comment;
use crate::client::services::api_client::{ApiClient, RequestOptions};
use crate::client::services::response_shape::{extract_list, unwrap_record};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct CommentsService {
    api: ApiClient,
}

impl CommentsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self, event_id: i64) -> ApiResult<Vec<Comment>> {
        let res = self.api.request_value(&comments_path(event_id), RequestOptions::get()).await?;
        Ok(extract_list(&res))
    }

    /// Posts a comment; ids go in snake_case.
    pub async fn create(&self, event_id: i64, content: &str, creator_id: i64) -> ApiResult<Comment> {
        let body = json!({ "content": content, "creator_id": creator_id, "event_id": event_id });
        let res = self.api.request_value(&comments_path(event_id), RequestOptions::post().json(body)).await?;
        let mut comment = Comment::from_json(unwrap_record(&res));
        if comment.content.is_empty() {
            comment.content = content.to_string();
        }
        comment.event_id.get_or_insert(event_id);
        Ok(comment)
    }

    pub async fn delete(&self, event_id: i64, comment_id: i64) -> ApiResult<()> {
        let path = format!("{}/{}", comments_path(event_id), comment_id);
        self.api.request(&path, RequestOptions::delete()).await.map(|_| ())
    }
}

fn comments_path(event_id: i64) -> String {
    format!("/api/events/{}/comments", event_id)
}
