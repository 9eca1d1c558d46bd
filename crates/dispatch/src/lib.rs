//! The delivery pipeline: admission, scheduling, and per-channel workers.
//!
//! This crate wires the domain types to the shared queue, the state
//! store, the status bus, and the outbound provider:
//!
//! - [`AdmissionService`] — the single create/cancel path with
//!   idempotency, template expansion, and enqueue-or-defer.
//! - [`Scheduler`] — periodic sweep promoting due deferred records into
//!   the queue.
//! - [`WorkerPool`] — fixed per-channel pools that dequeue, rate-limit,
//!   invoke the provider, and apply retry with exponential backoff.
//! - [`WebhookProvider`] — the concrete outbound HTTP adapter.
//!
//! Persistence is reached through the [`store`] traits so the pipeline
//! can be exercised against an in-memory store in tests.

pub mod admission;
pub mod error;
pub mod provider;
pub mod scheduler;
pub mod store;
pub mod worker;

pub use admission::{AdmissionService, CreateNotification};
pub use error::ServiceError;
pub use provider::{Provider, WebhookProvider};
pub use scheduler::Scheduler;
pub use store::{NotificationStore, PgStore, TemplateStore};
pub use worker::{WorkerPool, WorkerPoolConfig};
