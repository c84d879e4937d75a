use axum::body::Bytes;
use axum::extract::ws::Message;
use atelier_core::protocol::ProgressEvent;
use atelier_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for the connected observer.
pub struct ObserverConnection {
    /// Identifier assigned when the socket was upgraded.
    pub conn_id: String,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Why an outbound message could not be handed to the observer.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("No observer connected")]
    NoObserver,

    #[error("Observer connection {0} is closed")]
    Closed(String),

    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Holds the single observer connection.
///
/// Installing a connection replaces the previous one wholesale; there is
/// no multiplexing and no replay. Thread-safe via interior `RwLock`;
/// designed to be wrapped in `Arc` and shared by the controller, watcher
/// and heartbeat.
#[derive(Default)]
pub struct ObserverSession {
    current: RwLock<Option<ObserverConnection>>,
}

impl ObserverSession {
    /// Create a session with no observer attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `conn_id` the observer.
    ///
    /// A previously installed observer is sent a Close frame. Returns the
    /// receiver half of the message channel so the caller can forward
    /// messages to the WebSocket sink.
    pub async fn install(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = ObserverConnection {
            conn_id: conn_id.clone(),
            sender: tx,
            connected_at: chrono::Utc::now(),
        };

        let previous = self.current.write().await.replace(conn);
        if let Some(previous) = previous {
            let _ = previous.sender.send(Message::Close(None));
            tracing::info!(
                conn_id = %conn_id,
                superseded = %previous.conn_id,
                "Observer superseded by new connection",
            );
        }
        rx
    }

    /// Detach `conn_id` if it is still the current observer.
    ///
    /// Returns whether anything was removed; a stale connection never
    /// evicts its successor.
    pub async fn remove(&self, conn_id: &str) -> bool {
        let mut current = self.current.write().await;
        if current.as_ref().is_some_and(|c| c.conn_id == conn_id) {
            *current = None;
            true
        } else {
            false
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn current_id(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|c| c.conn_id.clone())
    }

    /// When the current observer connected, if any.
    pub async fn connected_at(&self) -> Option<Timestamp> {
        self.current.read().await.as_ref().map(|c| c.connected_at)
    }

    /// Serialize `event` once and queue it for the observer.
    pub async fn send_event(&self, event: &ProgressEvent) -> Result<(), SendError> {
        let text = event.to_json()?;
        self.send(Message::Text(text.into())).await
    }

    /// Queue a raw message for the observer.
    ///
    /// Messages are delivered in the order they are queued.
    pub async fn send(&self, message: Message) -> Result<(), SendError> {
        let current = self.current.read().await;
        let conn = current.as_ref().ok_or(SendError::NoObserver)?;
        conn.sender
            .send(message)
            .map_err(|_| SendError::Closed(conn.conn_id.clone()))
    }

    /// Send a Ping frame to the observer.
    ///
    /// Used by the heartbeat task to keep the connection alive.
    pub async fn ping(&self) -> Result<(), SendError> {
        self.send(Message::Ping(Bytes::new())).await
    }

    /// Send a Close frame to the observer and detach it.
    ///
    /// Used during graceful shutdown.
    pub async fn shutdown(&self) {
        if let Some(conn) = self.current.write().await.take() {
            let _ = conn.sender.send(Message::Close(None));
            tracing::info!(conn_id = %conn.conn_id, "Closed observer connection");
        }
    }
}
