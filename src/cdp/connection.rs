//! WebSocket transport for the DevTools protocol
//!
//! One connection per target. Outgoing commands go through the write
//! half behind a mutex; a spawned reader task owns the read half and
//! routes responses to pending callers and events to subscribers.

use super::traits::{CdpConnection, CdpError as CdpErrorResponse, CdpEvent, CdpResponse};
use super::types::{CdpNotification, CdpRequest, CdpRpcResponse};
use crate::Error;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

type PendingMap = Arc<Mutex<HashMap<u64, PendingCommand>>>;
type SubscriberList = Arc<Mutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>;

/// Per-command timeouts; navigation and capture commands get more room.
#[derive(Debug, Clone)]
struct CommandTimeouts {
    default_secs: u64,
    navigation_secs: u64,
    capture_secs: u64,
}

impl Default for CommandTimeouts {
    fn default() -> Self {
        Self {
            default_secs: 30,
            navigation_secs: 60,
            capture_secs: 90,
        }
    }
}

impl CommandTimeouts {
    fn for_method(&self, method: &str) -> tokio::time::Duration {
        let method = method.to_lowercase();

        let secs = if method.contains("capture") || method.contains("screenshot") {
            self.capture_secs
        } else if method.contains("navigate") || method.contains("reload") {
            self.navigation_secs
        } else {
            self.default_secs
        };

        tokio::time::Duration::from_secs(secs)
    }
}

#[derive(Debug)]
struct PendingCommand {
    sender: oneshot::Sender<CdpResponse>,
    /// Kept for logging when the response arrives late or never
    method: String,
}

/// WebSocket-backed [`CdpConnection`]
#[derive(Debug)]
pub struct CdpWebSocketConnection {
    url: String,
    writer: Arc<Mutex<WsWriter>>,
    next_id: AtomicU64,
    pending: PendingMap,
    subscribers: SubscriberList,
    active: Arc<AtomicBool>,
    timeouts: CommandTimeouts,
}

impl CdpWebSocketConnection {
    /// Connect to a DevTools target
    ///
    /// # Arguments
    /// * `url` - target WebSocket URL (e.g. "ws://localhost:9222/devtools/page/ABC")
    pub async fn connect<S: Into<String>>(url: S) -> Result<Arc<Self>, Error> {
        let url = url.into();
        info!("Connecting to CDP target at {}", url);

        let (ws, _) = connect_async(&url)
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect to {}: {}", url, e)))?;

        let (writer, reader) = ws.split();

        let connection = Arc::new(Self {
            url,
            writer: Arc::new(Mutex::new(writer)),
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(AtomicBool::new(true)),
            timeouts: CommandTimeouts::default(),
        });

        tokio::spawn(Self::read_loop(
            reader,
            Arc::clone(&connection.writer),
            Arc::clone(&connection.pending),
            Arc::clone(&connection.subscribers),
            Arc::clone(&connection.active),
        ));

        Ok(connection)
    }

    /// Reader task: owns the read half until the socket closes.
    async fn read_loop(
        mut reader: WsReader,
        writer: Arc<Mutex<WsWriter>>,
        pending: PendingMap,
        subscribers: SubscriberList,
        active: Arc<AtomicBool>,
    ) {
        debug!("CDP reader task started");

        while let Some(message) = reader.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    Self::route_message(&text, &pending, &subscribers).await;
                }
                Ok(Message::Ping(data)) => {
                    let mut writer = writer.lock().await;
                    if let Err(e) = writer.send(Message::Pong(data)).await {
                        warn!("Failed to answer ping: {}", e);
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("CDP target sent close frame");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("WebSocket read error: {}", e);
                    break;
                }
            }
        }

        active.store(false, Ordering::SeqCst);

        // Dropping the senders wakes every in-flight caller with a channel error.
        let mut pending = pending.lock().await;
        let abandoned = pending.len();
        pending.clear();
        if abandoned > 0 {
            warn!("Connection closed with {} commands in flight", abandoned);
        }

        debug!("CDP reader task exited");
    }

    /// Route one incoming frame to a pending caller or the subscribers.
    async fn route_message(text: &str, pending: &PendingMap, subscribers: &SubscriberList) {
        // Responses carry an id; everything else is an event.
        if let Ok(response) = serde_json::from_str::<CdpRpcResponse>(text) {
            let mut pending = pending.lock().await;
            match pending.remove(&response.id) {
                Some(command) => {
                    debug!("Response for {} (id {})", command.method, response.id);
                    let _ = command.sender.send(CdpResponse {
                        id: response.id,
                        result: Some(response.result),
                        error: response.error.map(|e| CdpErrorResponse {
                            code: e.code,
                            message: e.message,
                            data: e.data,
                        }),
                    });
                }
                None => warn!("Response for unknown command id {}", response.id),
            }
            return;
        }

        if let Ok(notification) = serde_json::from_str::<CdpNotification>(text) {
            let event = CdpEvent {
                method: notification.method,
                params: notification.params,
                session_id: notification.session_id,
            };

            let mut subscribers = subscribers.lock().await;
            subscribers.retain(|sender| sender.send(event.clone()).is_ok());
            return;
        }

        warn!("Unrecognized CDP frame: {}", text);
    }

    /// Target URL this connection is attached to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CdpConnection for CdpWebSocketConnection {
    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
            session_id: None,
        };

        let json = serde_json::to_string(&request)?;
        debug!("Sending CDP command {} (id {})", method, id);

        let (sender, receiver) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(
                id,
                PendingCommand {
                    sender,
                    method: method.to_string(),
                },
            );
        }

        {
            let mut writer = self.writer.lock().await;
            writer
                .send(Message::Text(json))
                .await
                .map_err(|e| Error::websocket(format!("Failed to send command: {}", e)))?;
        }

        let timeout = self.timeouts.for_method(method);

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(response)) => {
                if let Some(error) = &response.error {
                    return Err(Error::cdp(format!(
                        "{} failed: {} (code {})",
                        method, error.message, error.code
                    )));
                }
                Ok(response)
            }
            Ok(Err(_)) => Err(Error::websocket(format!(
                "Connection closed while waiting for {} (id {})",
                method, id
            ))),
            Err(_) => {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                Err(Error::timeout(format!("{} (id {}) timed out", method, id)))
            }
        }
    }

    async fn listen_events(&self) -> Result<mpsc::Receiver<CdpEvent>, Error> {
        let (sender, receiver) = mpsc::channel(100);
        let (unbounded_sender, mut unbounded_receiver) = mpsc::unbounded_channel();

        {
            let mut subscribers = self.subscribers.lock().await;
            subscribers.push(unbounded_sender);
        }

        // Bridge to a bounded channel so a slow consumer cannot grow the
        // broadcast queue without bound on the connection side.
        tokio::spawn(async move {
            while let Some(event) = unbounded_receiver.recv().await {
                if sender.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(receiver)
    }

    async fn close(&self) -> Result<(), Error> {
        info!("Closing CDP connection to {}", self.url);

        self.active.store(false, Ordering::SeqCst);

        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Close(None))
            .await
            .map_err(|e| Error::websocket(format!("Failed to close WebSocket: {}", e)))?;

        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_commands_get_longer_timeout() {
        let timeouts = CommandTimeouts::default();
        assert_eq!(
            timeouts.for_method("Page.navigate"),
            tokio::time::Duration::from_secs(60)
        );
        assert_eq!(
            timeouts.for_method("Runtime.evaluate"),
            tokio::time::Duration::from_secs(30)
        );
        assert_eq!(
            timeouts.for_method("Page.captureScreenshot"),
            tokio::time::Duration::from_secs(90)
        );
    }
}
