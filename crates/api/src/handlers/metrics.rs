//! Queue inspection endpoint.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use courier_core::notification::Channel;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Per-channel queue statistics.
#[derive(Debug, Serialize)]
pub struct ChannelMetrics {
    /// Tokens currently waiting in the channel's queue.
    pub depth: usize,
    /// Provider calls admitted within the trailing one-second window.
    pub current_rate: usize,
}

/// GET /metrics/queues
///
/// Reports queue depth and the current egress rate for every channel.
pub async fn queue_metrics(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<HashMap<&'static str, ChannelMetrics>>>> {
    let depths = state.queue.depths_all().await;

    let mut channels = HashMap::new();
    for channel in Channel::ALL {
        channels.insert(
            channel.as_str(),
            ChannelMetrics {
                depth: depths.get(&channel).copied().unwrap_or(0),
                current_rate: state.limiter.current_rate(channel).await,
            },
        );
    }

    Ok(Json(DataResponse { data: channels }))
}
