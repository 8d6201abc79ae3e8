use crate::client::config::ClientConfig;
use crate::client::error::ApiResult;
use crate::client::models::chat::ChatMessage;
use crate::client::services::chat_service::MessageSource;
use crate::client::services::websocket_client::{chat_socket_url, ChatSocket, TransportEvent};
use crate::client::utils::session_store::SessionHandle;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// Not started, or running without a socket.
    Idle,
    Connecting,
    Open,
    Closed,
}

struct RoomInner {
    chat_id: i64,
    source: Arc<dyn MessageSource>,
    session: SessionHandle,
    ws_base: String,
    poll_interval: Duration,
    messages: Mutex<Vec<ChatMessage>>,
    state: Mutex<RoomState>,
    realtime: AtomicBool,
    shut_down: AtomicBool,
    socket: Mutex<Option<ChatSocket>>,
    poller: Mutex<Option<JoinHandle<()>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    revision: AtomicU64,
    changes: watch::Sender<u64>,
}

/// Live view of one chat room: REST history, pushed frames over a
/// WebSocket, and a polling fallback once the socket is gone.
#[derive(Clone)]
pub struct ChatRoom {
    inner: Arc<RoomInner>,
}

impl ChatRoom {
    pub fn new(chat_id: i64, source: Arc<dyn MessageSource>, session: SessionHandle, config: &ClientConfig) -> Self {
        Self::with_transport(chat_id, source, session, config.ws_base(), config.chat_poll_interval)
    }

    /// Same as [`new`](Self::new) with an explicit socket base and polling
    /// period. An empty base means polling only.
    pub fn with_transport(
        chat_id: i64,
        source: Arc<dyn MessageSource>,
        session: SessionHandle,
        ws_base: String,
        poll_interval: Duration,
    ) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(RoomInner {
                chat_id,
                source,
                session,
                ws_base,
                poll_interval,
                messages: Mutex::new(Vec::new()),
                state: Mutex::new(RoomState::Idle),
                realtime: AtomicBool::new(false),
                shut_down: AtomicBool::new(false),
                socket: Mutex::new(None),
                poller: Mutex::new(None),
                pump: Mutex::new(None),
                revision: AtomicU64::new(0),
                changes,
            }),
        }
    }

    pub fn chat_id(&self) -> i64 {
        self.inner.chat_id
    }

    pub async fn state(&self) -> RoomState {
        *self.inner.state.lock().await
    }

    pub fn is_realtime(&self) -> bool {
        self.inner.realtime.load(Ordering::SeqCst)
    }

    pub async fn is_polling(&self) -> bool {
        self.inner.poller.lock().await.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.inner.messages.lock().await.clone()
    }

    /// Bumped every time the message list changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Loads the history, then opens the socket (or starts polling when no
    /// socket base is configured).
    pub async fn start(&self) {
        if self.is_shut_down() {
            return;
        }
        let initial = match self.inner.source.fetch_messages(self.inner.chat_id).await {
            Ok(list) => list,
            Err(e) => {
                warn!("[CHAT_ROOM] initial load of {} failed: {}", self.inner.chat_id, e);
                Vec::new()
            }
        };
        self.replace_messages(initial).await;

        if self.inner.ws_base.is_empty() {
            info!("[CHAT_ROOM] no socket base, polling room {}", self.inner.chat_id);
            self.start_polling().await;
            return;
        }

        let token = self.inner.session.token();
        let url = chat_socket_url(&self.inner.ws_base, self.inner.chat_id, token.as_deref());
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        *self.inner.state.lock().await = RoomState::Connecting;
        *self.inner.socket.lock().await = Some(ChatSocket::connect(url, events_tx));

        let room = self.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                room.handle_event(event).await;
            }
        });
        *self.inner.pump.lock().await = Some(pump);
    }

    /// Applies one transport event to the room.
    pub async fn handle_event(&self, event: TransportEvent) {
        if self.is_shut_down() {
            return;
        }
        match event {
            TransportEvent::Open => {
                debug!("[CHAT_ROOM] realtime active for {}", self.inner.chat_id);
                self.inner.realtime.store(true, Ordering::SeqCst);
                *self.inner.state.lock().await = RoomState::Open;
                self.stop_polling().await;
            }
            TransportEvent::Message(msg) => {
                self.inner.messages.lock().await.push(msg);
                self.notify();
            }
            TransportEvent::Error(reason) => {
                warn!("[CHAT_ROOM] socket error in {}: {}", self.inner.chat_id, reason);
                self.fall_back_to_polling().await;
            }
            TransportEvent::Closed => {
                debug!("[CHAT_ROOM] socket closed for {}", self.inner.chat_id);
                self.fall_back_to_polling().await;
            }
        }
    }

    /// Posts over REST, echoes on the socket when it is open, and appends
    /// the message locally. Blank input is ignored.
    pub async fn send(&self, text: &str) -> Option<ChatMessage> {
        let content = text.trim();
        if content.is_empty() {
            return None;
        }

        if let Err(e) = self.inner.source.post_message(self.inner.chat_id, content).await {
            warn!("[CHAT_ROOM] send to {} failed: {}", self.inner.chat_id, e);
        }

        if self.is_realtime() {
            if let Some(socket) = self.inner.socket.lock().await.as_ref() {
                if let Err(e) = socket.send_chat(content) {
                    debug!("[CHAT_ROOM] socket echo skipped: {}", e);
                }
            }
        }

        let msg = ChatMessage::optimistic(content, self.inner.session.user_id());
        self.inner.messages.lock().await.push(msg.clone());
        self.notify();
        Some(msg)
    }

    /// Leaves the room on the backend, then shuts the room down.
    pub async fn leave(&self) -> ApiResult<()> {
        self.inner.source.leave(self.inner.chat_id).await?;
        self.shutdown().await;
        Ok(())
    }

    /// Stops polling and closes the socket. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.realtime.store(false, Ordering::SeqCst);
        self.stop_polling().await;
        if let Some(socket) = self.inner.socket.lock().await.take() {
            socket.close();
        }
        if let Some(pump) = self.inner.pump.lock().await.take() {
            pump.abort();
        }
        *self.inner.state.lock().await = RoomState::Closed;
        info!("[CHAT_ROOM] room {} shut down", self.inner.chat_id);
    }

    /// Fetches the list once and replaces local state when it looks different.
    pub async fn poll_once(&self) {
        match self.inner.source.fetch_messages(self.inner.chat_id).await {
            Ok(list) => {
                let mut current = self.inner.messages.lock().await;
                if differs(&current, &list) {
                    *current = list;
                    drop(current);
                    self.notify();
                }
            }
            Err(e) => debug!("[CHAT_ROOM] poll of {} failed: {}", self.inner.chat_id, e),
        }
    }

    async fn fall_back_to_polling(&self) {
        self.inner.realtime.store(false, Ordering::SeqCst);
        *self.inner.state.lock().await = RoomState::Closed;
        self.start_polling().await;
    }

    async fn start_polling(&self) {
        if self.is_shut_down() {
            return;
        }
        let mut poller = self.inner.poller.lock().await;
        if poller.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return;
        }
        let period = self.inner.poll_interval;
        let room = self.clone();
        *poller = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                room.poll_once().await;
            }
        }));
        debug!("[CHAT_ROOM] polling {} every {:?}", self.inner.chat_id, period);
    }

    async fn stop_polling(&self) {
        if let Some(handle) = self.inner.poller.lock().await.take() {
            handle.abort();
        }
    }

    async fn replace_messages(&self, list: Vec<ChatMessage>) {
        *self.inner.messages.lock().await = list;
        self.notify();
    }

    fn notify(&self) {
        let next = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.inner.changes.send(next);
    }

    fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ChatRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRoom")
            .field("chat_id", &self.inner.chat_id)
            .field("realtime", &self.is_realtime())
            .finish()
    }
}

/// Length changed, or the last message reads differently.
fn differs(current: &[ChatMessage], next: &[ChatMessage]) -> bool {
    current.len() != next.len() || current.last().map(|m| &m.content) != next.last().map(|m| &m.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msgs(contents: &[&str]) -> Vec<ChatMessage> {
        contents.iter().map(|c| ChatMessage { content: c.to_string(), ..Default::default() }).collect()
    }

    #[test]
    fn replacement_needs_length_or_tail_change() {
        assert!(!differs(&msgs(&["a", "b"]), &msgs(&["x", "b"])));
        assert!(differs(&msgs(&["a", "b"]), &msgs(&["a", "c"])));
        assert!(differs(&msgs(&["a"]), &msgs(&["a", "b"])));
        assert!(!differs(&[], &[]));
        assert!(differs(&[], &msgs(&["a"])));
    }
}
