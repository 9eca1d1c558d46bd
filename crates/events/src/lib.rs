//! Status fan-out infrastructure.
//!
//! - [`StatusBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, carrying [`StatusUpdate`] envelopes.
//! - [`StatusSink`] — the publication interface injected into the
//!   admission service and worker pool, keeping the pipeline oblivious
//!   to the transport of updates.
//! - [`SubscriptionFilter`] — per-subscriber matching on notification
//!   ids, batch ids, and channels.

pub mod bus;
pub mod filter;

pub use bus::{StatusBus, StatusSink, StatusUpdate};
pub use filter::SubscriptionFilter;
