use std::sync::Arc;

use crate::config::AppConfig;
use crate::ws::WsManager;
use courier_dispatch::AdmissionService;
use courier_events::StatusBus;
use courier_queue::{PriorityQueue, RateLimiter};

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already
/// `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: courier_db::DbPool,
    /// Server configuration.
    pub config: Arc<AppConfig>,
    /// Admission service: the single create/cancel path.
    pub admission: Arc<AdmissionService>,
    /// Shared delivery queue (inspected by the metrics endpoint).
    pub queue: Arc<PriorityQueue>,
    /// Per-channel rate limiter (inspected by the metrics endpoint).
    pub limiter: Arc<RateLimiter>,
    /// Status bus feeding the WebSocket dispatcher.
    pub status_bus: Arc<StatusBus>,
    /// WebSocket connection manager.
    pub ws_manager: Arc<WsManager>,
}
