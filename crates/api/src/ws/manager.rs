use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};

use courier_core::types::Timestamp;
use courier_events::{StatusUpdate, SubscriptionFilter};

/// Outbound buffer size per subscriber. When a subscriber's buffer is
/// full, further updates are dropped for that subscriber only; the
/// publisher is never blocked.
const SUBSCRIBER_BUFFER: usize = 256;

/// Shared handle to a connection's subscription filter. `None` means the
/// subscriber receives every update.
pub type FilterHandle = Arc<RwLock<Option<SubscriptionFilter>>>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Bounded channel sender for outbound messages to this connection.
    pub sender: mpsc::Sender<Message>,
    /// The connection's current subscription filter.
    pub filter: FilterHandle,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the bounded message channel (for the
    /// caller's I/O task) and the shared filter handle (for the caller's
    /// read loop).
    pub async fn add(&self, conn_id: String) -> (mpsc::Receiver<Message>, FilterHandle) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let filter: FilterHandle = Arc::new(RwLock::new(None));
        let conn = WsConnection {
            sender: tx,
            filter: Arc::clone(&filter),
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        (rx, filter)
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Deliver a status update to every connection whose filter matches.
    ///
    /// The envelope is serialized once. A connection with a full buffer
    /// has this update dropped; connections whose send channels are
    /// closed are skipped (they are cleaned up by their own I/O task).
    pub async fn broadcast_update(&self, update: &StatusUpdate) {
        let payload = match serde_json::to_string(update) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize status update");
                return;
            }
        };

        let conns = self.connections.read().await;
        for (conn_id, conn) in conns.iter() {
            let matches = {
                let filter = conn.filter.read().await;
                filter
                    .as_ref()
                    .map_or(true, |f| f.matches(&update.notification))
            };
            if !matches {
                continue;
            }

            if let Err(mpsc::error::TrySendError::Full(_)) =
                conn.sender.try_send(Message::Text(payload.clone().into()))
            {
                tracing::debug!(conn_id = %conn_id, "Subscriber buffer full, dropping update");
            }
        }
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.try_send(Message::Ping(Bytes::new()));
        }
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.try_send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
