use crate::client::error::ApiResult;
use crate::client::models::event::{Event, EventDraft, EventPage, EventQuery};
use crate::client::services::api_client::{encode_segment, with_query, ApiClient, RequestOptions};
use crate::client::services::response_shape::{extract_array, extract_list, extract_number, extract_total, unwrap_record};
use log::debug;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct EventsService {
    api: ApiClient,
}

impl EventsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn create(&self, draft: &EventDraft) -> ApiResult<Event> {
        let body = serde_json::to_value(draft)?;
        let res = self.api.request_value("/api/events/creation", RequestOptions::post().json(body)).await?;
        Ok(Event::from_json(unwrap_record(&res)))
    }

    /// Event feed. Handles bare arrays as well as `{ ok, data: { items, pagination } }`.
    pub async fn list(&self, query: &EventQuery) -> ApiResult<EventPage> {
        let path = with_query(
            "/api/events",
            &[
                ("search", query.search.clone().unwrap_or_default()),
                ("userId", query.user_id.map(|v| v.to_string()).unwrap_or_default()),
                ("page", query.page.map(|v| v.to_string()).unwrap_or_default()),
                ("size", query.size.map(|v| v.to_string()).unwrap_or_default()),
            ],
        );
        let raw = self.api.request_value(&path, RequestOptions::get()).await?;
        Ok(page_from_response(&raw, query))
    }

    /// Single event; a blank id gives `None` without calling the backend.
    pub async fn get(&self, event_id: &str) -> ApiResult<Option<Event>> {
        let id = event_id.trim();
        if id.is_empty() {
            return Ok(None);
        }
        let res = self.api.request_value(&format!("/api/events/{}", encode_segment(id)), RequestOptions::get()).await?;
        let mut event = Event::from_json(unwrap_record(&res));
        if event.id.is_none() {
            event.id = id.parse().ok();
        }
        Ok(Some(event))
    }

    /// `PUT /edit`, falling back to `PATCH /api/events/{id}` when the edit
    /// route does not exist.
    pub async fn update(&self, event_id: i64, draft: &EventDraft) -> ApiResult<Value> {
        let body = serde_json::to_value(draft)?;
        let edit = format!("/api/events/{}/edit", event_id);
        match self.api.request_value(&edit, RequestOptions::put().json(body.clone())).await {
            Err(e) if e.is_not_found() => {
                debug!("[EVENTS] {} not found, retrying as PATCH", edit);
                self.api
                    .request_value(&format!("/api/events/{}", event_id), RequestOptions::patch().json(body))
                    .await
            }
            other => other,
        }
    }

    pub async fn delete(&self, event_id: i64) -> ApiResult<Value> {
        self.api
            .request_value(&format!("/api/events/{}/cancel", event_id), RequestOptions::delete())
            .await
    }

    pub async fn apply(&self, event_id: i64, message: Option<&str>) -> ApiResult<Value> {
        let mut options = RequestOptions::post();
        if let Some(message) = message.filter(|m| !m.is_empty()) {
            options = options.json(json!({ "message": message }));
        }
        self.api.request_value(&format!("/api/events/{}/application", event_id), options).await
    }

    pub async fn cancel_application(&self, event_id: i64, application_id: i64) -> ApiResult<Value> {
        let path = format!("/api/events/{}/application/{}/cancel", event_id, application_id);
        self.api.request_value(&path, RequestOptions::delete()).await
    }

    /// Events the current user created or joined.
    pub async fn my_events(&self) -> ApiResult<Vec<Event>> {
        let res = self.api.request_value("/api/events/me", RequestOptions::get()).await?;
        Ok(extract_list(&res))
    }
}

fn page_from_response(raw: &Value, query: &EventQuery) -> EventPage {
    let data = match raw.get("data") {
        Some(inner) if !inner.is_null() => inner,
        _ => raw,
    };
    let items: Vec<Event> = extract_array(data).iter().map(Event::from_json).collect();
    let count = items.len() as u64;
    EventPage {
        page: extract_number(data, &["/pagination/page", "page"]).or(query.page).unwrap_or(1),
        size: extract_number(data, &["/pagination/size", "size"]).or(query.size).unwrap_or(count),
        total: extract_total(data).unwrap_or(count),
        items,
    }
}
