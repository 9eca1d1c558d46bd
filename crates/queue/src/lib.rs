//! Shared in-process queueing primitives for the delivery pipeline.
//!
//! - [`PriorityQueue`] — per-channel ordered queue of dequeue tokens,
//!   scored so that priority classes strictly dominate arrival order.
//! - [`RateLimiter`] — per-channel sliding-window egress limiter with a
//!   cooperative blocking [`wait`](RateLimiter::wait).
//!
//! Both structures are designed to be shared via `Arc` across the
//! admission path, the scheduler, and every worker task. All mutation
//! happens under a single async mutex per structure, so the
//! check-then-act sequences are observed under a consistent snapshot.

pub mod queue;
pub mod rate_limiter;

pub use queue::PriorityQueue;
pub use rate_limiter::RateLimiter;
