//! WebSocket handler for the live session-event stream.
//!
//! Clients connect to `GET /ws` and receive every committed session state
//! change as JSON: joins, score submissions, completions, cancellations,
//! and redemptions. The stream is fan-out only; incoming frames other than
//! close/ping are ignored.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/ws');
//! ws.onmessage = (event) => {
//!   const change = JSON.parse(event.data);
//!   if (change.type === 'session_completed') {
//!     showWinner(change.session_id, change.winner_user_id);
//!   }
//! };
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use super::AppState;
use crate::metrics;

/// Upgrade the HTTP connection to a WebSocket event stream.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut events = state.notifier.subscribe();
    metrics::websocket_connections_active(state.notifier.subscriber_count());
    tracing::info!("event-stream client connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let payload = match serde_json::to_string(&event) {
                            Ok(payload) => payload,
                            Err(e) => {
                                tracing::error!("failed to serialize event: {e}");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("event-stream client lagged, skipped {skipped} events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Ignore pings (answered by axum) and stray client frames.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::info!("event-stream client disconnected");
    metrics::websocket_connections_active(state.notifier.subscriber_count().saturating_sub(1));
}
