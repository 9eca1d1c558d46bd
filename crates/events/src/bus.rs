//! In-process status bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`StatusBus`] is the central publish/subscribe hub for notification
//! state transitions. It is designed to be shared via `Arc<StatusBus>`
//! across the admission service, the worker pool, and the WebSocket
//! dispatcher.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;

use courier_core::notification::Notification;
use courier_core::types::Timestamp;

// ---------------------------------------------------------------------------
// StatusUpdate
// ---------------------------------------------------------------------------

/// A state-transition envelope as delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    /// Envelope discriminator, always `"status_update"`.
    #[serde(rename = "type")]
    pub kind: &'static str,

    /// The notification after the transition.
    pub notification: Notification,

    /// When the update was published (UTC).
    pub timestamp: Timestamp,
}

impl StatusUpdate {
    pub fn new(notification: Notification) -> Self {
        Self {
            kind: "status_update",
            notification,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// StatusSink
// ---------------------------------------------------------------------------

/// Publication interface for components that emit status transitions.
///
/// The admission service and worker pool hold an `Arc<dyn StatusSink>`
/// rather than a concrete bus, so tests can capture updates and the
/// transport can evolve independently of the pipeline.
pub trait StatusSink: Send + Sync {
    fn publish_status(&self, notification: &Notification);
}

// ---------------------------------------------------------------------------
// StatusBus
// ---------------------------------------------------------------------------

/// Default capacity of the broadcast ring buffer.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out hub for [`StatusUpdate`]s.
///
/// Publishing never blocks: when a subscriber falls more than the buffer
/// capacity behind, its oldest pending updates are dropped and it
/// observes `RecvError::Lagged`. Status is always persisted in the state
/// store before publication, so a dropped update loses no correctness.
pub struct StatusBus {
    sender: broadcast::Sender<StatusUpdate>,
}

impl StatusBus {
    /// Create a bus with a specific ring-buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an update to all current subscribers.
    ///
    /// If there are no active subscribers the update is silently dropped.
    pub fn publish(&self, update: StatusUpdate) {
        // The SendError only means there are zero receivers.
        let _ = self.sender.send(update);
    }

    /// Subscribe to all updates published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StatusSink for StatusBus {
    fn publish_status(&self, notification: &Notification) {
        self.publish(StatusUpdate::new(notification.clone()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
