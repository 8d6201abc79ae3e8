use crate::client::config::{join_path, ClientConfig};
use crate::client::error::{ApiError, ApiResult, ErrorBody};
use crate::client::utils::session_store::SessionHandle;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const PROFILE_PATH: &str = "/api/auth/profile";

const JSON_MIME: &str = "application/json";

/// Request body. Only `Json` and JSON-looking `Text` get the JSON content type.
#[derive(Debug, Clone)]
pub enum Body {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Body>,
    pub headers: Vec<(String, String)>,
    /// Non-2xx statuses the caller handles itself.
    pub ok_statuses: Vec<u16>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { method: Method::GET, body: None, headers: Vec::new(), ok_statuses: Vec::new() }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn method(method: Method) -> Self {
        Self { method, ..Self::default() }
    }

    pub fn post() -> Self {
        Self::method(Method::POST)
    }

    pub fn put() -> Self {
        Self::method(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::method(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::method(Method::DELETE)
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(Body::Json(value));
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn accept_status(mut self, status: u16) -> Self {
        self.ok_statuses.push(status);
        self
    }
}

/// Successful response content.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// 204/205 or an empty body.
    Empty,
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// JSON view of the payload; empty becomes `null`, text becomes a string.
    pub fn into_value(self) -> Value {
        match self {
            Payload::Empty => Value::Null,
            Payload::Json(v) => v,
            Payload::Text(t) => Value::String(t),
        }
    }
}

impl From<ErrorBody> for Payload {
    fn from(body: ErrorBody) -> Self {
        match body {
            ErrorBody::Json(v) => Payload::Json(v),
            ErrorBody::Text(t) => Payload::Text(t),
            ErrorBody::Empty => Payload::Empty,
        }
    }
}

/// Authenticated JSON client with the single 401 → refresh → retry path.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    session: SessionHandle,
    /// Serializes refreshes so concurrent 401s trigger one refresh call.
    refresh_gate: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: SessionHandle) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(config.connect_timeout)
            .build()?;
        let base = config.rest_base();
        if base.is_empty() {
            warn!("[API] REST base is empty; requests will use bare paths");
        }
        Ok(Self { http, base, session, refresh_gate: Arc::new(Mutex::new(())) })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        join_path(&self.base, endpoint)
    }

    pub async fn get(&self, endpoint: &str) -> ApiResult<Payload> {
        self.request(endpoint, RequestOptions::get()).await
    }

    /// Like [`request`](Self::request) with empty results mapped to `null`.
    pub async fn request_value(&self, endpoint: &str, options: RequestOptions) -> ApiResult<Value> {
        Ok(self.request(endpoint, options).await?.into_value())
    }

    /// Issues one request, refreshing the session once on 401.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> ApiResult<Payload> {
        let is_refresh_call = endpoint.starts_with(REFRESH_PATH);
        let seen_generation = self.session.generation();

        let response = self.send(endpoint, &options).await?;
        if response.status() != StatusCode::UNAUTHORIZED || is_refresh_call {
            return self.finish(endpoint, &options, response).await;
        }

        debug!("[API] 401 on {}, attempting session refresh", endpoint);
        self.recover_session(seen_generation).await?;

        let retried = self.send(endpoint, &options).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            warn!("[API] {} still unauthorized after refresh", endpoint);
            self.expire_session();
            return Err(ApiError::SessionExpired);
        }
        self.finish(endpoint, &options, retried).await
    }

    /// Tries each request in order and returns the first success, or the
    /// last error when every variant fails.
    pub async fn try_many(&self, attempts: Vec<(String, RequestOptions)>) -> ApiResult<Payload> {
        let mut last_err = ApiError::Validation("no request variants given".to_string());
        for (path, options) in attempts {
            match self.request(&path, options).await {
                Ok(payload) => return Ok(payload),
                Err(e @ ApiError::SessionExpired) => return Err(e),
                Err(e) => {
                    debug!("[API] variant {} failed: {}", path, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    /// Posts to the refresh endpoint, then to its trailing-slash twin when
    /// the first attempt fails. Returns the JSON body of the first success.
    pub async fn refresh_session(&self) -> Option<Value> {
        let slash = format!("{}/", REFRESH_PATH);
        for path in [REFRESH_PATH, slash.as_str()] {
            let url = self.url_for(path);
            let sent = self
                .http
                .post(&url)
                .header(CONTENT_TYPE, JSON_MIME)
                .header(ACCEPT, JSON_MIME)
                .body("{}")
                .send()
                .await;
            match sent {
                Ok(response) if response.status().is_success() => {
                    if !is_json(&response) {
                        debug!("[REFRESH] {} answered without JSON", path);
                        return None;
                    }
                    return response.json::<Value>().await.ok();
                }
                Ok(response) => debug!("[REFRESH] {} answered {}", path, response.status()),
                Err(e) => debug!("[REFRESH] {} failed: {}", path, e),
            }
        }
        None
    }

    async fn recover_session(&self, seen_generation: u64) -> ApiResult<()> {
        let _gate = self.refresh_gate.lock().await;

        if self.session.generation() != seen_generation {
            // Another caller finished a refresh (or a logout) while we waited.
            return if self.session.is_logged_in() {
                debug!("[REFRESH] session already renewed by a concurrent request");
                Ok(())
            } else {
                Err(ApiError::SessionExpired)
            };
        }

        let refreshed = self.refresh_session().await;
        let user = refreshed
            .as_ref()
            .and_then(|body| body.get("user"))
            .filter(|u| !u.is_null())
            .cloned();

        match user {
            Some(user) => {
                let token = refreshed.as_ref().and_then(extract_token);
                self.session
                    .update(|s| {
                        if token.is_some() {
                            s.token = token;
                        }
                        s.user = Some(user);
                        s.logged_in = true;
                    })
                    .map_err(|e| ApiError::Store(e.to_string()))?;
                info!("[REFRESH] session renewed");
                Ok(())
            }
            None => {
                warn!("[REFRESH] refresh failed, clearing local session");
                self.expire_session();
                Err(ApiError::SessionExpired)
            }
        }
    }

    fn expire_session(&self) {
        if let Err(e) = self.session.clear() {
            warn!("[API] failed to clear session store: {}", e);
        }
    }

    async fn send(&self, endpoint: &str, options: &RequestOptions) -> ApiResult<Response> {
        let url = self.url_for(endpoint);
        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
            let value = HeaderValue::from_str(value).map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
            headers.insert(name, value);
        }

        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static(JSON_MIME));
        }

        if !is_auth_exempt(endpoint) && !headers.contains_key(AUTHORIZATION) {
            if let Some(token) = self.session.token() {
                let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
                headers.insert(AUTHORIZATION, bearer);
            }
        }

        let explicit_content_type = headers.contains_key(CONTENT_TYPE);
        let mut request = self.http.request(options.method.clone(), &url);
        match &options.body {
            Some(Body::Json(value)) => {
                if !explicit_content_type {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
                }
                request = request.body(serde_json::to_vec(value)?);
            }
            Some(Body::Text(text)) => {
                if !explicit_content_type && serde_json::from_str::<Value>(text).is_ok() {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
                }
                request = request.body(text.clone());
            }
            Some(Body::Bytes(bytes)) => request = request.body(bytes.clone()),
            Some(Body::Form(pairs)) => request = request.form(pairs),
            None => {}
        }

        debug!("[API] {} {}", options.method, url);
        Ok(request.headers(headers).send().await?)
    }

    async fn finish(&self, endpoint: &str, options: &RequestOptions, response: Response) -> ApiResult<Payload> {
        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return Ok(Payload::Empty);
        }

        let content_type = content_type(&response);
        let text = response.text().await?;

        if !status.is_success() {
            let body = error_body(content_type.as_deref(), text);
            let code = status.as_u16();
            let profile_missing = code == 404 && endpoint.contains(PROFILE_PATH);
            if profile_missing || options.ok_statuses.contains(&code) {
                return Ok(body.into());
            }
            let message = body.message().unwrap_or_else(|| format!("HTTP {}", code));
            warn!("[API] {} {} -> {} ({})", options.method, endpoint, code, message);
            return Err(ApiError::Http { status: code, message, body });
        }

        if text.trim().is_empty() {
            return Ok(Payload::Empty);
        }
        match content_type.as_deref() {
            Some(ct) if ct.contains(JSON_MIME) => Ok(Payload::Json(serde_json::from_str(&text)?)),
            Some(_) => Ok(Payload::Text(text)),
            // No declared type: take JSON when it parses.
            None => Ok(serde_json::from_str(&text).map(Payload::Json).unwrap_or(Payload::Text(text))),
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base", &self.base).field("session", &self.session).finish()
    }
}

/// Appends the non-empty pairs as a query string.
pub fn with_query(path: &str, pairs: &[(&str, String)]) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs.iter().filter(|(_, v)| !v.is_empty()) {
        query.append_pair(key, value);
    }
    let query = query.finish();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}

/// Percent-encodes one path segment.
pub fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect::<String>().replace('+', "%20")
}

/// Login and refresh calls never carry the bearer token.
pub fn is_auth_exempt(endpoint: &str) -> bool {
    endpoint.starts_with(LOGIN_PATH) || endpoint.starts_with(REFRESH_PATH)
}

/// Token under any of the names the auth endpoints use.
pub fn extract_token(body: &Value) -> Option<String> {
    let direct = ["token", "accessToken", "access_token", "jwt"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str));
    let nested = || {
        body.get("data")
            .and_then(|d| ["token", "accessToken"].iter().find_map(|k| d.get(*k).and_then(Value::as_str)))
    };
    direct.or_else(nested).filter(|t| !t.is_empty()).map(str::to_string)
}

fn content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
}

fn is_json(response: &Response) -> bool {
    content_type(response).map(|ct| ct.contains(JSON_MIME)).unwrap_or(false)
}

fn error_body(content_type: Option<&str>, text: String) -> ErrorBody {
    let declared_json = content_type.map(|ct| ct.contains(JSON_MIME)).unwrap_or(false);
    if declared_json {
        // A JSON error body that does not parse carries no message.
        return serde_json::from_str::<Value>(&text).map(ErrorBody::Json).unwrap_or(ErrorBody::Empty);
    }
    if text.is_empty() {
        ErrorBody::Empty
    } else {
        ErrorBody::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auth_endpoints_are_exempt_from_bearer() {
        assert!(is_auth_exempt("/api/auth/login"));
        assert!(is_auth_exempt("/api/auth/refresh/"));
        assert!(!is_auth_exempt("/api/auth/logout"));
        assert!(!is_auth_exempt("/api/events"));
    }

    #[test]
    fn token_is_found_under_alternate_names() {
        assert_eq!(extract_token(&json!({ "token": "a" })).as_deref(), Some("a"));
        assert_eq!(extract_token(&json!({ "access_token": "b" })).as_deref(), Some("b"));
        assert_eq!(extract_token(&json!({ "data": { "accessToken": "c" } })).as_deref(), Some("c"));
        assert_eq!(extract_token(&json!({ "token": "" })), None);
        assert_eq!(extract_token(&json!({ "user": {} })), None);
    }

    #[test]
    fn error_body_follows_declared_content_type() {
        assert_eq!(error_body(Some("application/json"), "{\"message\":\"x\"}".into()), ErrorBody::Json(json!({ "message": "x" })));
        assert_eq!(error_body(Some("application/json"), "oops".into()), ErrorBody::Empty);
        assert_eq!(error_body(Some("text/plain"), "oops".into()), ErrorBody::Text("oops".into()));
        assert_eq!(error_body(Some("text/html"), String::new()), ErrorBody::Empty);
    }

    #[test]
    fn query_skips_empty_values() {
        let q = with_query("/api/events", &[("search", "kimchi stew".into()), ("page", String::new()), ("size", "10".into())]);
        assert_eq!(q, "/api/events?search=kimchi+stew&size=10");
        assert_eq!(with_query("/api/events", &[]), "/api/events");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn payload_into_value() {
        assert_eq!(Payload::Empty.into_value(), Value::Null);
        assert_eq!(Payload::Text("hi".into()).into_value(), json!("hi"));
    }
}
