//! Bus-to-WebSocket status dispatcher.
//!
//! [`StatusDispatcher`] is the single task draining the status bus. Each
//! received update is fanned out to matching subscribers through the
//! [`WsManager`], which applies per-connection filters and bounded
//! buffering.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use courier_events::StatusUpdate;

use crate::ws::WsManager;

/// Routes published status updates to WebSocket subscribers.
pub struct StatusDispatcher {
    ws_manager: Arc<WsManager>,
}

impl StatusDispatcher {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the dispatch loop.
    ///
    /// Exits when the cancellation token fires or the bus is closed. A
    /// lagged receiver logs how many updates were skipped; status is
    /// already persisted, so nothing is lost beyond the live stream.
    pub async fn run(self, mut receiver: broadcast::Receiver<StatusUpdate>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Status dispatcher shutting down");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(update) => {
                        self.ws_manager.broadcast_update(&update).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Status dispatcher lagged, dropping updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Status bus closed, dispatcher shutting down");
                        break;
                    }
                }
            }
        }
    }
}
