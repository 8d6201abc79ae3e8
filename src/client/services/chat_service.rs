use crate::client::error::ApiResult;
use crate::client::models::chat::{ChatMessage, ChatPreview};
use crate::client::models::event::Event;
use crate::client::services::api_client::{ApiClient, RequestOptions};
use crate::client::services::events_service::EventsService;
use crate::client::services::response_shape::extract_list;
use async_trait::async_trait;
use futures_util::future::join_all;
use log::debug;
use serde_json::json;

/// How many of the user's events get a preview in the chat list.
pub const PREVIEW_LIMIT: usize = 20;

/// REST side of a chat room, as seen by the real-time transport.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_messages(&self, chat_id: i64) -> ApiResult<Vec<ChatMessage>>;
    async fn post_message(&self, chat_id: i64, content: &str) -> ApiResult<()>;
    async fn leave(&self, chat_id: i64) -> ApiResult<()>;
}

#[derive(Debug, Clone)]
pub struct ChatService {
    api: ApiClient,
}

impl ChatService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Full message history of a room.
    pub async fn get_messages(&self, chat_id: i64) -> ApiResult<Vec<ChatMessage>> {
        let res = self.api.request_value(&chat_path(chat_id), RequestOptions::get()).await?;
        Ok(extract_list(&res))
    }

    pub async fn send_message(&self, chat_id: i64, content: &str) -> ApiResult<()> {
        let options = RequestOptions::post().json(json!({ "content": content }));
        self.api.request(&chat_path(chat_id), options).await.map(|_| ())
    }

    pub async fn leave_chat(&self, chat_id: i64) -> ApiResult<()> {
        self.api.request(&chat_path(chat_id), RequestOptions::patch()).await.map(|_| ())
    }

    /// One preview per joined event (first [`PREVIEW_LIMIT`]), fetched
    /// concurrently. A room whose history fails to load still gets a row.
    pub async fn previews(&self) -> ApiResult<Vec<ChatPreview>> {
        let events = EventsService::new(self.api.clone()).my_events().await?;
        let rooms: Vec<(i64, Event)> = events
            .into_iter()
            .take(PREVIEW_LIMIT)
            .filter_map(|ev| ev.id.map(|id| (id, ev)))
            .collect();

        let histories = join_all(rooms.iter().map(|(id, _)| self.get_messages(*id))).await;

        Ok(rooms
            .into_iter()
            .zip(histories)
            .map(|((chat_id, event), history)| {
                let last = match history {
                    Ok(mut messages) => messages.pop(),
                    Err(e) => {
                        debug!("[CHAT] history of {} unavailable: {}", chat_id, e);
                        None
                    }
                };
                ChatPreview {
                    chat_id,
                    title: event.title,
                    last_message: last.as_ref().map(|m| m.content.clone()),
                    last_at: last.and_then(|m| m.created_at),
                    participants: Some(event.participants_count),
                }
            })
            .collect())
    }
}

#[async_trait]
impl MessageSource for ChatService {
    async fn fetch_messages(&self, chat_id: i64) -> ApiResult<Vec<ChatMessage>> {
        self.get_messages(chat_id).await
    }

    async fn post_message(&self, chat_id: i64, content: &str) -> ApiResult<()> {
        self.send_message(chat_id, content).await
    }

    async fn leave(&self, chat_id: i64) -> ApiResult<()> {
        self.leave_chat(chat_id).await
    }
}

fn chat_path(chat_id: i64) -> String {
    format!("/api/chats/{}", chat_id)
}
