use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use courier_events::SubscriptionFilter;

use crate::state::AppState;
use crate::ws::manager::{FilterHandle, WsManager};

/// Subscription control message sent by the client.
///
/// `{"action":"subscribe","filter":{...}}` narrows the stream;
/// `{"action":"unsubscribe"}` restores receive-all.
#[derive(Debug, Deserialize)]
struct SubscribeMessage {
    action: String,
    #[serde(default)]
    filter: Option<SubscriptionFilter>,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by two tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards buffered updates to the sink.
///   3. Processes inbound subscription messages on the current task.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let (mut rx, filter) = ws_manager.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward buffered messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: process inbound subscription messages.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => {
                handle_control_message(&conn_id, text.as_str(), &filter).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection and abort sender task.
    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Apply a subscribe/unsubscribe control message to the connection's
/// filter. Malformed messages are ignored.
async fn handle_control_message(conn_id: &str, text: &str, filter: &FilterHandle) {
    let Ok(msg) = serde_json::from_str::<SubscribeMessage>(text) else {
        return;
    };

    match msg.action.as_str() {
        "subscribe" => {
            let new_filter = msg.filter.unwrap_or_default();
            tracing::info!(conn_id = %conn_id, filter = ?new_filter, "Client subscribed");
            *filter.write().await = Some(new_filter);
        }
        "unsubscribe" => {
            tracing::info!(conn_id = %conn_id, "Client unsubscribed");
            *filter.write().await = None;
        }
        _ => {}
    }
}
