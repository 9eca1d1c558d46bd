use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::WsManager;

/// Interval between keep-alive pings. Chosen below the 60-second idle
/// window so healthy clients are never considered stale.
const HEARTBEAT_INTERVAL_SECS: u64 = 54;

/// Spawn a background task that sends periodic Ping frames to all
/// connected WebSocket clients.
///
/// The returned `JoinHandle` is aborted during shutdown.
pub fn start_heartbeat(ws_manager: Arc<WsManager>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));

        loop {
            interval.tick().await;
            let count = ws_manager.connection_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            ws_manager.ping_all().await;
        }
    })
}
