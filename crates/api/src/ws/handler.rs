use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::engine::JobController;
use crate::state::AppState;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection becomes the observer and is served by
/// two tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.controller))
}

/// Manage a single observer connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Installs the connection as the observer and resets any job.
///   2. Spawns a sender task that forwards queued events to the sink.
///   3. Dispatches inbound text frames to the controller in order.
///   4. Detaches the observer on disconnect.
async fn handle_socket(socket: WebSocket, controller: Arc<JobController>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "Observer connected");

    let mut rx = controller.on_observer_connected(&conn_id).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "Observer sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    // Receiver loop: commands are handled one at a time, so a stop request
    // holds this loop until the trainer has exited.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if controller.observer().current_id().await.as_deref() != Some(conn_id.as_str()) {
                    tracing::debug!(conn_id = %conn_id, "Superseded observer, dropping command");
                    break;
                }
                controller.handle_message(text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {
                tracing::debug!(conn_id = %conn_id, "Ignoring non-text frame");
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "Observer receive error");
                break;
            }
        }
    }

    // Clean up: detach (if still current) and abort the sender task.
    controller.observer().remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "Observer disconnected");
}
