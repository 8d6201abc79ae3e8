#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use bobple::{ApiClient, ClientConfig, SessionHandle};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One request as the mock backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    pub fn param(&self, key: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn is(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

pub struct Reply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, content_type: Some("application/json".into()), body: body.to_string() }
    }

    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    pub fn text(status: u16, content_type: &str, body: &str) -> Self {
        Self { status, content_type: Some(content_type.into()), body: body.into() }
    }

    pub fn empty(status: u16) -> Self {
        Self { status, content_type: None, body: String::new() }
    }

    pub fn not_found() -> Self {
        Self::json(404, serde_json::json!({ "message": "not found" }))
    }
}

type Responder = Arc<dyn Fn(&Recorded) -> Reply + Send + Sync>;

/// What the socket endpoint does after a client connects.
#[derive(Debug, Clone, Default)]
pub struct SocketScript {
    pub frames: Vec<String>,
    pub close_after: bool,
}

#[derive(Clone)]
struct Shared {
    responder: Responder,
    requests: Arc<Mutex<Vec<Recorded>>>,
    script: SocketScript,
    socket_frames: Arc<Mutex<Vec<String>>>,
    socket_connections: Arc<Mutex<Vec<(i64, Option<String>)>>>,
}

/// In-process backend: every REST call goes through the test's responder,
/// `/ws/chats/:id` plays the socket script.
pub struct MockBackend {
    pub base: String,
    pub ws_base: String,
    shared: Shared,
}

impl MockBackend {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Recorded) -> Reply + Send + Sync + 'static,
    {
        Self::with_socket(responder, SocketScript::default()).await
    }

    pub async fn with_socket<F>(responder: F, script: SocketScript) -> Self
    where
        F: Fn(&Recorded) -> Reply + Send + Sync + 'static,
    {
        let shared = Shared {
            responder: Arc::new(responder),
            requests: Arc::default(),
            script,
            socket_frames: Arc::default(),
            socket_connections: Arc::default(),
        };
        let app = Router::new()
            .route("/ws/chats/:id", get(socket_handler))
            .fallback(rest_handler)
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock backend");
        let addr = listener.local_addr().expect("mock address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend");
        });

        Self { base: format!("http://{}", addr), ws_base: format!("ws://{}", addr), shared }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::for_base(&self.base)
    }

    pub fn client(&self) -> ApiClient {
        self.client_with(SessionHandle::in_memory())
    }

    pub fn client_with(&self, session: SessionHandle) -> ApiClient {
        ApiClient::new(&self.config(), session).expect("client")
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.requests.lock().unwrap().clone()
    }

    /// Requests to `path`, any method.
    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    pub fn last(&self, path: &str) -> Option<Recorded> {
        self.requests().into_iter().rev().find(|r| r.path == path)
    }

    pub fn socket_frames(&self) -> Vec<String> {
        self.shared.socket_frames.lock().unwrap().clone()
    }

    pub fn socket_connections(&self) -> Vec<(i64, Option<String>)> {
        self.shared.socket_connections.lock().unwrap().clone()
    }
}

async fn rest_handler(
    State(shared): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_text = |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let recorded = Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header_text(header::AUTHORIZATION),
        content_type: header_text(header::CONTENT_TYPE),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    shared.requests.lock().unwrap().push(recorded.clone());

    let reply = (shared.responder)(&recorded);
    let mut response = Response::builder().status(StatusCode::from_u16(reply.status).unwrap());
    if let Some(ct) = reply.content_type.as_deref() {
        response = response.header(header::CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
    }
    response.body(axum::body::Body::from(reply.body)).unwrap()
}

async fn socket_handler(
    ws: WebSocketUpgrade,
    Path(chat_id): Path<i64>,
    Query(params): Query<HashMap<String, String>>,
    State(shared): State<Shared>,
) -> Response {
    shared.socket_connections.lock().unwrap().push((chat_id, params.get("token").cloned()));
    ws.on_upgrade(move |socket| play_script(socket, shared))
}

async fn play_script(mut socket: WebSocket, shared: Shared) {
    for frame in &shared.script.frames {
        if socket.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }
    if shared.script.close_after {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => shared.socket_frames.lock().unwrap().push(text),
            Message::Close(_) => break,
            _ => {}
        }
    }
}

/// Re-checks `check` every 10 ms for up to two seconds.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
