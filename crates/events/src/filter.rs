//! Per-subscriber filtering of status updates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use courier_core::notification::{Channel, Notification};

/// Subscription filter supplied by a status-stream client.
///
/// A subscriber with no filter (or an entirely empty one) receives every
/// update. When any list is non-empty, the subscriber receives an update
/// iff it matches at least one criterion of at least one non-empty list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notification_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub batch_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<Channel>,
}

impl SubscriptionFilter {
    pub fn is_empty(&self) -> bool {
        self.notification_ids.is_empty() && self.batch_ids.is_empty() && self.channels.is_empty()
    }

    /// Whether an update for `notification` should reach this subscriber.
    pub fn matches(&self, notification: &Notification) -> bool {
        if self.is_empty() {
            return true;
        }

        if self.notification_ids.contains(&notification.id) {
            return true;
        }

        if let Some(batch_id) = notification.batch_id {
            if self.batch_ids.contains(&batch_id) {
                return true;
            }
        }

        self.channels.contains(&notification.channel)
    }
}
