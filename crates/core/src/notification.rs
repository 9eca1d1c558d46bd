//! The notification entity and its lifecycle state machine.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A delivery transport. Each channel has an independent queue, worker pool,
/// and rate budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
    Push,
}

impl Channel {
    /// All recognized channels, in a stable order.
    pub const ALL: [Channel; 3] = [Channel::Sms, Channel::Email, Channel::Push];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Email => "email",
            Channel::Push => "push",
        }
    }

    /// Maximum content length in bytes for this channel.
    pub fn max_content_length(&self) -> usize {
        match self {
            // Up to 4 concatenated 160-byte SMS segments.
            Channel::Sms => 640,
            Channel::Email => 100_000,
            Channel::Push => 4_096,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(Channel::Sms),
            "email" => Ok(Channel::Email),
            "push" => Ok(Channel::Push),
            other => Err(CoreError::validation(
                "channel",
                format!("invalid channel: {other}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Categorical dequeue priority. Lower weight sorts first in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    /// Queue ordering weight. The gap between classes is large enough that
    /// the fractional-second timestamp tiebreaker can never promote an item
    /// across classes.
    pub fn weight(&self) -> i64 {
        match self {
            Priority::High => 0,
            Priority::Normal => 1_000_000,
            Priority::Low => 2_000_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(CoreError::validation(
                "priority",
                format!("invalid priority: {other}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status.
///
/// ```text
/// pending ──► queued ──► processing ──► sent ──► delivered
///    │            ▲           │
///    │            └── retry ──┤
/// scheduled ──────┘           └──► failed
///    │
///    └────────► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Scheduled,
    Queued,
    Processing,
    Sent,
    Delivered,
    Failed,
    Cancelled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Scheduled => "scheduled",
            Status::Queued => "queued",
            Status::Processing => "processing",
            Status::Sent => "sent",
            Status::Delivered => "delivered",
            Status::Failed => "failed",
            Status::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Sent | Status::Delivered | Status::Failed | Status::Cancelled
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "scheduled" => Ok(Status::Scheduled),
            "queued" => Ok(Status::Queued),
            "processing" => Ok(Status::Processing),
            "sent" => Ok(Status::Sent),
            "delivered" => Ok(Status::Delivered),
            "failed" => Ok(Status::Failed),
            "cancelled" => Ok(Status::Cancelled),
            other => Err(CoreError::validation(
                "status",
                format!("invalid status: {other}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// The canonical notification record. The state store owns the durable copy;
/// everything else holds it by value only for the duration of one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<Uuid>,
    pub recipient: String,
    pub channel: Channel,
    pub content: String,
    pub priority: Priority,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub retry_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Caller-supplied key/value map, opaque to the pipeline.
    pub metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Notification {
    /// Create a new pending notification with default priority.
    pub fn new(recipient: impl Into<String>, channel: Channel, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            batch_id: None,
            recipient: recipient.into(),
            channel,
            content: content.into(),
            priority: Priority::Normal,
            status: Status::Pending,
            scheduled_at: None,
            sent_at: None,
            external_id: None,
            retry_count: 0,
            idempotency_key: None,
            metadata: serde_json::Value::Object(Default::default()),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Cancellation is permitted only before a worker picks the record up.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self.status,
            Status::Pending | Status::Scheduled | Status::Queued
        )
    }

    pub fn mark_as_queued(&mut self) {
        self.status = Status::Queued;
        self.updated_at = Utc::now();
    }

    pub fn mark_as_processing(&mut self) {
        self.status = Status::Processing;
        self.updated_at = Utc::now();
    }

    /// Record a successful provider send. Sets `sent_at` and the
    /// provider-assigned external id.
    pub fn mark_as_sent(&mut self, external_id: impl Into<String>) {
        let now = Utc::now();
        self.status = Status::Sent;
        self.external_id = Some(external_id.into());
        self.sent_at = Some(now);
        self.updated_at = now;
    }

    pub fn mark_as_failed(&mut self, error_message: impl Into<String>) {
        self.status = Status::Failed;
        self.error_message = Some(error_message.into());
        self.updated_at = Utc::now();
    }

    pub fn mark_as_cancelled(&mut self) {
        self.status = Status::Cancelled;
        self.updated_at = Utc::now();
    }

    pub fn increment_retry(&mut self) {
        self.retry_count += 1;
        self.updated_at = Utc::now();
    }

    /// Validate content length against the channel cap.
    pub fn validate_content_length(channel: Channel, content: &str) -> Result<(), CoreError> {
        let max = channel.max_content_length();
        if content.len() > max {
            return Err(CoreError::validation(
                "content",
                format!("content exceeds maximum length of {max} bytes for {channel} channel"),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Filter for listing notifications. Page values are clamped in the
/// repository layer.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub status: Option<Status>,
    pub channel: Option<Channel>,
    pub batch_id: Option<Uuid>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// One page of a filtered listing, ordered by `created_at` descending.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
