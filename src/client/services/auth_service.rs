use crate::client::error::{ApiError, ApiResult};
use crate::client::models::profile::{ProfileUpdate, UserProfile};
use crate::client::services::api_client::{extract_token, ApiClient, RequestOptions, LOGIN_PATH};
use crate::common::lenient::value_is_truthy;
use log::{info, warn};
use serde_json::{json, Value};

pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const PROFILE_UPDATE_PATH: &str = "/api/auth/profile/";

#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Email/password login. The token is kept only when the backend
    /// reports success; the login flag is raised on success or when a user
    /// comes back.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Value> {
        let body = json!({ "email": email, "password": password });
        let response = self.api.request_value(LOGIN_PATH, RequestOptions::post().json(body)).await?;

        let success = response.get("success").map(value_is_truthy).unwrap_or(false);
        let user = response.get("user").filter(|u| !u.is_null()).cloned();
        let token = extract_token(&response).filter(|_| success);

        self.api
            .session()
            .update(|s| {
                if let Some(token) = token {
                    s.token = Some(token);
                }
                if let Some(user) = user.clone() {
                    s.user = Some(user);
                }
                if success || user.is_some() {
                    s.logged_in = true;
                }
            })
            .map_err(|e| ApiError::Store(e.to_string()))?;
        info!("[AUTH] login answered (success={})", success);
        Ok(response)
    }

    /// Login with an identity-provider id token.
    pub async fn login_with_id_token(&self, id_token: &str) -> ApiResult<Value> {
        let body = json!({ "idToken": id_token });
        let response = self.api.request_value(LOGIN_PATH, RequestOptions::post().json(body)).await?;

        let token = extract_token(&response);
        let user = ["user", "success"]
            .iter()
            .filter_map(|k| response.get(*k))
            .find(|u| value_is_truthy(u))
            .cloned();

        self.api
            .session()
            .update(|s| {
                if let Some(token) = token {
                    s.token = Some(token);
                }
                if let Some(user) = user {
                    s.user = Some(user);
                }
                s.logged_in = true;
            })
            .map_err(|e| ApiError::Store(e.to_string()))?;
        Ok(response)
    }

    /// Tells the backend, then clears local state whatever it answered.
    pub async fn logout(&self) -> ApiResult<()> {
        let result = self.api.request(LOGOUT_PATH, RequestOptions::post()).await;
        if let Err(e) = self.api.session().clear() {
            warn!("[AUTH] failed to clear session store: {}", e);
        }
        result.map(|_| ())
    }

    /// Current user, recovered through the refresh endpoint. Failures give `None`.
    pub async fn get_profile(&self) -> Option<UserProfile> {
        let refreshed = self.api.refresh_session().await?;
        let me = refreshed.get("user").filter(|u| !u.is_null()).cloned().unwrap_or(refreshed);
        let profile = UserProfile::from_json(&me);
        if profile.id.is_some() {
            if let Err(e) = self.api.session().set_user(me) {
                warn!("[AUTH] failed to persist profile: {}", e);
            }
        }
        Some(profile)
    }

    /// Initial profile setup from raw form labels.
    pub async fn update_profile(&self, grade: &str, gender: &str, nickname: &str) -> ApiResult<Value> {
        let update = ProfileUpdate::from_form(grade, gender, nickname)?;
        let body = serde_json::to_value(&update)?;
        self.api.request_value(PROFILE_UPDATE_PATH, RequestOptions::put().json(body)).await
    }
}
