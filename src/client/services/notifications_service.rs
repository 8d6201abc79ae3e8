use crate::client::error::ApiResult;
use crate::client::models::notification::{NewNotification, Notification, NotificationQuery};
use crate::client::services::api_client::{encode_segment, with_query, ApiClient, RequestOptions};
use crate::client::services::response_shape::extract_list;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct NotificationsService {
    api: ApiClient,
}

impl NotificationsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self, query: &NotificationQuery) -> ApiResult<Vec<Notification>> {
        let path = with_query(
            "/api/notifications",
            &[
                ("unreadOnly", query.unread_only.map(|v| v.to_string()).unwrap_or_default()),
                ("type", query.kind.clone().unwrap_or_default()),
                ("page", query.page.map(|v| v.to_string()).unwrap_or_default()),
                ("size", query.size.map(|v| v.to_string()).unwrap_or_default()),
            ],
        );
        let res = self.api.request_value(&path, RequestOptions::get()).await?;
        Ok(extract_list(&res))
    }

    pub async fn mark_read(&self, notification_id: &str) -> ApiResult<()> {
        let options = RequestOptions::patch().json(json!({ "isRead": true }));
        self.api.request(&notification_path(notification_id), options).await.map(|_| ())
    }

    pub async fn delete(&self, notification_id: &str) -> ApiResult<()> {
        self.api
            .request(&notification_path(notification_id), RequestOptions::delete())
            .await
            .map(|_| ())
    }

    pub async fn create(&self, notification: &NewNotification) -> ApiResult<Value> {
        let body = serde_json::to_value(notification)?;
        self.api.request_value("/api/notification", RequestOptions::post().json(body)).await
    }
}

fn notification_path(id: &str) -> String {
    format!("/api/notifications/{}", encode_segment(id))
}
