//! WebSocket status-stream infrastructure.
//!
//! Clients connect to `/ws`, optionally narrow their subscription with a
//! filter, and receive `status_update` envelopes as notifications move
//! through the pipeline. One dispatcher task drains the status bus; one
//! I/O task per subscriber forwards its bounded buffer to the socket.

pub mod dispatcher;
pub mod handler;
pub mod heartbeat;
pub mod manager;

pub use dispatcher::StatusDispatcher;
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
