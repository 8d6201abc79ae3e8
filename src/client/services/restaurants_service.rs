use crate::client::error::{ApiError, ApiResult};
use crate::client::models::restaurant::{Restaurant, RestaurantPage, RestaurantQuery};
use crate::client::services::api_client::{encode_segment, with_query, ApiClient, RequestOptions};
use crate::client::services::response_shape::{extract_array, extract_has_next, extract_total, unwrap_record};
use chrono::Utc;
use log::debug;
use serde_json::Value;

/// Page budget of [`RestaurantsService::collect_by_category`].
pub const DEFAULT_MAX_PAGES: u64 = 50;

#[derive(Debug, Clone)]
pub struct RestaurantsService {
    api: ApiClient,
}

impl RestaurantsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// One page of restaurants. Request failures give an empty page.
    pub async fn list(&self, query: &RestaurantQuery) -> RestaurantPage {
        let path = with_query("/api/restaurants", &query_pairs(query));
        match self.api.request_value(&path, RequestOptions::get()).await {
            Ok(raw) => page_from_response(&raw, query.page, query.limit),
            Err(e) => {
                debug!("[RESTAURANTS] list failed: {}", e);
                RestaurantPage { page: query.page, limit: query.limit, total: Some(0), ..Default::default() }
            }
        }
    }

    /// Sponsored restaurants only.
    pub async fn recommendations(&self, page: u64, limit: u64) -> RestaurantPage {
        let query = RestaurantQuery { page, limit, sponsored_only: Some("1".to_string()), ..Default::default() };
        self.list(&query).await
    }

    /// Keyword search over the three routes the backend has exposed.
    pub async fn search(&self, keyword: &str) -> ApiResult<Vec<Restaurant>> {
        let attempts = [
            with_query("/api/restaurants", &[("keyword", keyword.to_string())]),
            with_query("/api/restaurants/search", &[("q", keyword.to_string())]),
            with_query("/api/restaurants", &[("q", keyword.to_string())]),
        ]
        .into_iter()
        .map(|path| (path, RequestOptions::get()))
        .collect();
        let raw = self.api.try_many(attempts).await?.into_value();
        Ok(extract_array(&raw).iter().map(Restaurant::from_json).collect())
    }

    /// Detail lookup; when the detail route gives nothing usable, searches
    /// by the id and picks the exact match.
    pub async fn get_by_id(&self, id: &str) -> ApiResult<Option<Restaurant>> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(None);
        }
        match self
            .api
            .request_value(&format!("/api/restaurants/{}", encode_segment(id)), RequestOptions::get())
            .await
        {
            Ok(raw) if raw.is_object() || raw.is_array() => {
                if let Some(found) = pick_record(&raw, id) {
                    return Ok(Some(found));
                }
            }
            Err(e @ ApiError::SessionExpired) => return Err(e),
            Ok(_) => debug!("[RESTAURANTS] detail for {} was empty", id),
            Err(e) => debug!("[RESTAURANTS] detail for {} failed: {}", id, e),
        }

        let raw = self
            .api
            .request_value(&with_query("/api/restaurants", &[("q", id.to_string())]), RequestOptions::get())
            .await?;
        let wanted = id.parse::<i64>().ok();
        Ok(extract_array(&raw)
            .iter()
            .map(Restaurant::from_json)
            .find(|r| wanted.is_some() && r.id == wanted))
    }

    /// Pages through the unfiltered-by-server list, keeping only `category`,
    /// until enough rows exist for `page` or the source runs dry.
    pub async fn collect_by_category(
        &self,
        category: &str,
        page: u64,
        limit: u64,
        q: Option<String>,
        max_pages: Option<u64>,
    ) -> RestaurantPage {
        let target = category.to_uppercase();
        let need_until = usize::try_from(page.saturating_mul(limit)).unwrap_or(usize::MAX);
        let max_pages = max_pages.unwrap_or(DEFAULT_MAX_PAGES);

        let mut collected: Vec<Restaurant> = Vec::new();
        let mut cursor = 1;
        let mut keep_going = true;
        while collected.len() < need_until && keep_going && cursor <= max_pages {
            let query = RestaurantQuery {
                page: cursor,
                limit,
                q: q.clone(),
                category: Some(target.clone()),
                sponsored_only: None,
            };
            let batch = self.list(&query).await;
            keep_going = batch.has_next || batch.items.len() as u64 == limit;
            collected.extend(batch.items.into_iter().filter(|r| r.category.as_str().to_uppercase() == target));
            cursor += 1;
        }

        slice_page(collected, page, limit)
    }
}

fn query_pairs(query: &RestaurantQuery) -> Vec<(&'static str, String)> {
    let limit = query.limit.to_string();
    let mut pairs = vec![("page", query.page.to_string())];
    for key in ["limit", "size", "perPage", "pageSize", "countPerPage"] {
        pairs.push((key, limit.clone()));
    }
    if let Some(q) = query.q.as_deref().filter(|q| !q.is_empty()) {
        for key in ["q", "query", "keyword"] {
            pairs.push((key, q.to_string()));
        }
    }
    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty() && *c != "ALL") {
        for key in ["category", "cat", "CATEGORY"] {
            pairs.push((key, category.to_string()));
        }
    }
    if let Some(flag) = &query.sponsored_only {
        for key in ["sponsoredOnly", "isSponsored", "recommendedOnly"] {
            pairs.push((key, flag.clone()));
        }
    }
    pairs.push(("_t", Utc::now().timestamp_millis().to_string()));
    pairs
}

fn page_from_response(raw: &Value, page: u64, limit: u64) -> RestaurantPage {
    let items: Vec<Restaurant> = extract_array(raw).iter().map(Restaurant::from_json).collect();
    let total = extract_total(raw);
    let fallback = match total {
        Some(total) => page.checked_mul(limit).map_or(false, |seen| seen < total),
        None => items.len() as u64 == limit,
    };
    RestaurantPage { has_next: extract_has_next(raw).unwrap_or(fallback), items, page, limit, total }
}

fn pick_record(raw: &Value, id: &str) -> Option<Restaurant> {
    let row = unwrap_record(raw);
    let picked = match row {
        Value::Array(items) => items.first()?,
        _ => match row.get("items") {
            Some(Value::Array(items)) => items.first()?,
            _ => row,
        },
    };
    let mut restaurant = Restaurant::from_json(picked);
    if restaurant.id.is_none() {
        restaurant.id = id.parse().ok();
    }
    Some(restaurant)
}

fn slice_page(collected: Vec<Restaurant>, page: u64, limit: u64) -> RestaurantPage {
    let limit_rows = usize::try_from(limit).unwrap_or(usize::MAX);
    let start = usize::try_from(page.saturating_sub(1).saturating_mul(limit)).unwrap_or(usize::MAX);
    let end = start.saturating_add(limit_rows);
    let total = collected.len() as u64;
    let has_next = collected.len() > end;
    let items = collected.into_iter().skip(start).take(limit_rows).collect();
    RestaurantPage { items, page, limit, has_next, total: Some(total) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::models::restaurant::Category;
    use serde_json::json;

    fn keys(pairs: &[(&str, String)]) -> Vec<String> {
        pairs.iter().map(|(k, _)| k.to_string()).collect()
    }

    #[test]
    fn query_fills_every_alias() {
        let query = RestaurantQuery {
            page: 2,
            limit: 10,
            q: Some("noodle".into()),
            category: Some("KOREAN".into()),
            sponsored_only: Some("1".into()),
        };
        let pairs = query_pairs(&query);
        let k = keys(&pairs);
        for key in ["page", "limit", "size", "perPage", "pageSize", "countPerPage", "q", "query", "keyword"] {
            assert!(k.contains(&key.to_string()), "{} missing", key);
        }
        for key in ["category", "cat", "CATEGORY", "sponsoredOnly", "isSponsored", "recommendedOnly", "_t"] {
            assert!(k.contains(&key.to_string()), "{} missing", key);
        }
    }

    #[test]
    fn all_category_and_empty_q_are_skipped() {
        let query = RestaurantQuery { category: Some("ALL".into()), q: Some(String::new()), ..Default::default() };
        let k = keys(&query_pairs(&query));
        assert!(!k.contains(&"category".to_string()));
        assert!(!k.contains(&"q".to_string()));
        assert!(!k.contains(&"sponsoredOnly".to_string()));
    }

    #[test]
    fn has_next_prefers_response_then_total_then_fill() {
        let raw = json!({ "items": [{ "id": 1 }], "hasNext": true });
        assert!(page_from_response(&raw, 1, 5).has_next);

        let raw = json!({ "items": [{ "id": 1 }, { "id": 2 }], "total": 4 });
        let page = page_from_response(&raw, 1, 2);
        assert!(page.has_next);
        assert_eq!(page.total, Some(4));
        assert!(!page_from_response(&raw, 2, 2).has_next);

        let raw = json!([{ "id": 1 }, { "id": 2 }]);
        assert!(page_from_response(&raw, 1, 2).has_next);
        assert!(!page_from_response(&raw, 1, 3).has_next);
    }

    #[test]
    fn record_is_picked_from_envelopes() {
        let r = pick_record(&json!({ "success": { "name": "Bap" } }), "7").unwrap();
        assert_eq!(r.id, Some(7));
        let r = pick_record(&json!({ "data": [{ "id": 3, "name": "Ramen", "category": "japanese" }] }), "3").unwrap();
        assert_eq!(r.category, Category::Japanese);
        assert!(pick_record(&json!({ "data": [] }), "3").is_none());
    }

    #[test]
    fn slicing_reports_remaining_rows() {
        let rows: Vec<Restaurant> = (1..=7).map(|i| Restaurant::from_json(&json!({ "id": i }))).collect();
        let page = slice_page(rows.clone(), 2, 3);
        assert_eq!(page.items.iter().filter_map(|r| r.id).collect::<Vec<_>>(), vec![4, 5, 6]);
        assert!(page.has_next);
        assert_eq!(page.total, Some(7));

        let page = slice_page(rows, 3, 3);
        assert_eq!(page.items.len(), 1);
        assert!(!page.has_next);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let page = page_from_response(&json!({ "items": [], "total": 3 }), u64::MAX, 5);
        assert!(!page.has_next);
        assert_eq!(page.page, u64::MAX);

        let rows: Vec<Restaurant> = (1..=3).map(|i| Restaurant::from_json(&json!({ "id": i }))).collect();
        let page = slice_page(rows.clone(), u64::MAX, 5);
        assert!(page.items.is_empty());
        assert!(!page.has_next);

        let page = slice_page(rows, 1, u64::MAX);
        assert_eq!(page.items.len(), 3);
        assert!(!page.has_next);
    }
}
