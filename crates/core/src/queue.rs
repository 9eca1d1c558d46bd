//! Queue token types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notification::{Channel, Notification, Priority};

/// A lightweight dequeue token. The queue owns it and deletes it on pop;
/// the worker must re-read the canonical record before acting on it, since
/// the same notification id can legitimately appear more than once across
/// retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub notification_id: Uuid,
    pub channel: Channel,
    pub priority: Priority,
    pub retry_count: i32,
}

impl QueueItem {
    /// Build a token for the current state of a notification.
    pub fn for_notification(n: &Notification) -> Self {
        Self {
            notification_id: n.id,
            channel: n.channel,
            priority: n.priority,
            retry_count: n.retry_count,
        }
    }
}
