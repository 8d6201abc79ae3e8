use crate::client::models::chat::ChatMessage;
use crate::client::services::api_client::encode_segment;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket is not open")]
    NotOpen,
    #[error("connection task has stopped")]
    Stopped,
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What the socket task reports back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Open,
    Message(ChatMessage),
    Error(String),
    Closed,
}

enum Command {
    Send(String),
    Close,
}

/// `{ws_base}/ws/chats/{id}`, with `?token=` only when a token exists.
pub fn chat_socket_url(ws_base: &str, chat_id: i64, token: Option<&str>) -> String {
    let base = ws_base.trim_end_matches('/');
    let url = format!("{}/ws/chats/{}", base, chat_id);
    match token.filter(|t| !t.is_empty()) {
        Some(token) => format!("{}?token={}", url, encode_segment(token)),
        None => url,
    }
}

/// Turns one text frame into a message.
///
/// JSON frames without content are dropped. Anything that is not JSON is
/// kept as plain text unless blank.
pub fn parse_frame(text: &str) -> Option<ChatMessage> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Some(ChatMessage::from_frame(&value)).filter(|m| !m.content.is_empty()),
        Err(_) if !text.trim().is_empty() => Some(ChatMessage::plain_text(text)),
        Err(_) => None,
    }
}

/// One WebSocket connection to a chat room. Never reconnects: after
/// `Closed` the owner falls back to polling.
pub struct ChatSocket {
    commands: mpsc::UnboundedSender<Command>,
    open: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ChatSocket {
    /// Spawns the connection task. Progress arrives on `events`.
    pub fn connect(url: String, events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_connection(url, events, command_rx, open.clone()));
        Self { commands, open, task }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Signals a new chat message to the room.
    pub fn send_chat(&self, content: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let frame = serde_json::to_string(&json!({ "type": "chat_message", "content": content }))?;
        self.commands.send(Command::Send(frame)).map_err(|_| TransportError::Stopped)
    }

    /// Asks the task to send a close frame and stop.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self.commands.send(Command::Close);
    }
}

impl Drop for ChatSocket {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_connection(
    url: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    open: Arc<AtomicBool>,
) {
    debug!("[WS:CHAT] connecting to {}", redact(&url));
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!("[WS:CHAT] connection failed: {}", e);
            let _ = events.send(TransportEvent::Error(e.to_string()));
            let _ = events.send(TransportEvent::Closed);
            return;
        }
    };

    info!("[WS:CHAT] connected");
    open.store(true, Ordering::SeqCst);
    let _ = events.send(TransportEvent::Open);
    let (mut writer, mut reader) = stream.split();

    loop {
        tokio::select! {
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(msg) = parse_frame(&text) {
                        if events.send(TransportEvent::Message(msg)).is_err() {
                            break;
                        }
                    } else {
                        debug!("[WS:CHAT] ignored frame without content");
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("[WS:CHAT] closed by server: {:?}", frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("[WS:CHAT] socket error: {}", e);
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break;
                }
                None => break,
            },
            command = commands.recv() => match command {
                Some(Command::Send(frame)) => {
                    if let Err(e) = writer.send(Message::Text(frame)).await {
                        warn!("[WS:CHAT] send failed: {}", e);
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        break;
                    }
                }
                Some(Command::Close) | None => {
                    let _ = writer.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }

    open.store(false, Ordering::SeqCst);
    info!("[WS:CHAT] connection ended");
    let _ = events.send(TransportEvent::Closed);
}

fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_encoded_token_only_when_present() {
        assert_eq!(chat_socket_url("ws://h:1/", 4, None), "ws://h:1/ws/chats/4");
        assert_eq!(chat_socket_url("ws://h:1", 4, Some("")), "ws://h:1/ws/chats/4");
        assert_eq!(chat_socket_url("wss://h", 4, Some("a b+c")), "wss://h/ws/chats/4?token=a%20b%2Bc");
    }

    #[test]
    fn frames_are_filtered_by_content() {
        let m = parse_frame(r#"{"id":1,"userId":2,"content":"hey"}"#).unwrap();
        assert_eq!(m.sender, Some(2));
        assert!(m.created_at.is_some());

        assert!(parse_frame(r#"{"type":"typing"}"#).is_none());
        assert!(parse_frame("42").is_none());
        assert!(parse_frame("   ").is_none());
        assert_eq!(parse_frame("hello there").unwrap().content, "hello there");
    }

    #[test]
    fn redacts_query() {
        assert_eq!(redact("ws://h/ws/chats/1?token=secret"), "ws://h/ws/chats/1");
    }
}
