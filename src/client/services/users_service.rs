use crate::client::error::ApiResult;
use crate::client::models::profile::UserProfile;
use crate::client::services::api_client::{ApiClient, RequestOptions};
use crate::client::services::response_shape::unwrap_record;

#[derive(Debug, Clone)]
pub struct UsersService {
    api: ApiClient,
}

impl UsersService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Public profile of another user.
    pub async fn get_user_profile(&self, user_id: i64) -> ApiResult<UserProfile> {
        let res = self.api.request_value(&format!("/api/users/{}", user_id), RequestOptions::get()).await?;
        let mut profile = UserProfile::from_json(unwrap_record(&res));
        profile.id.get_or_insert(user_id);
        Ok(profile)
    }
}
