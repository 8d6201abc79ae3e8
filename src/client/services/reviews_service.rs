use crate::client::error::ApiResult;
use crate::client::models::review::{NewReview, Review, ReviewKind};
use crate::client::services::api_client::{with_query, ApiClient, RequestOptions};
use crate::client::services::response_shape::extract_list;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ReviewsService {
    api: ApiClient,
}

impl ReviewsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self, user_id: i64, kind: ReviewKind, page: u64, limit: u64) -> ApiResult<Vec<Review>> {
        let path = with_query(
            &format!("/api/reviews/{}", user_id),
            &[("type", kind.as_str().to_string()), ("page", page.to_string()), ("limit", limit.to_string())],
        );
        let res = self.api.request_value(&path, RequestOptions::get()).await?;
        Ok(extract_list(&res))
    }

    /// Reviews about `user_id`, first page of ten.
    pub async fn received(&self, user_id: i64) -> ApiResult<Vec<Review>> {
        self.list(user_id, ReviewKind::Received, 1, 10).await
    }

    pub async fn create(&self, user_id: i64, review: &NewReview) -> ApiResult<Value> {
        let body = serde_json::to_value(review)?;
        self.api
            .request_value(&format!("/api/reviews/{}", user_id), RequestOptions::post().json(body))
            .await
    }
}
