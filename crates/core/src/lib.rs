//! Courier domain types.
//!
//! Pure domain layer for the notification delivery pipeline: channels,
//! priorities, the notification lifecycle state machine, queue tokens,
//! message templates, provider request/response shapes, and retry math.
//! No I/O — persistence, queueing, and transport live in the sibling
//! crates and depend on this one.

pub mod error;
pub mod notification;
pub mod provider;
pub mod queue;
pub mod retry;
pub mod template;
pub mod types;

pub use error::CoreError;
pub use notification::{Channel, Notification, Priority, Status};
pub use queue::QueueItem;
pub use template::Template;
