//! `WebSocket` handler for observers.
//!
//! Clients connect to `GET /ws/events`. Each connection first receives
//! one `events:initial` message with the full cache, then every
//! `events:new` and `collector:disabled` message the hub broadcasts.
//!
//! If an observer falls behind, lagged messages are skipped and the
//! observer resumes from the most recent message. Delivery failures only
//! end that observer's connection.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;
use worldpulse_core::adapter::now_millis;
use worldpulse_types::{EventsPayload, HubMessage};

use crate::state::HubState;

/// Upgrade an HTTP request to a `WebSocket` observer connection.
///
/// # Route
///
/// `GET /ws/events`
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<HubState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Encode a hub message as a text frame.
fn encode(message: &HubMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!(event = message.event_name(), "Failed to serialize hub message: {e}");
            None
        }
    }
}

/// Send the snapshot, then forward broadcasts until either side closes.
async fn handle_ws(mut socket: WebSocket, state: Arc<HubState>) {
    let observer_id = Uuid::new_v4();
    let (events, mut rx) = state.subscribe_with_snapshot();
    info!(
        %observer_id,
        snapshot = events.len(),
        observers = state.observer_count(),
        "Observer connected"
    );

    let initial = HubMessage::Initial(EventsPayload {
        events,
        timestamp: now_millis(),
    });
    if let Some(frame) = encode(&initial) {
        if socket.send(frame).await.is_err() {
            debug!(%observer_id, "Observer disconnected before snapshot");
            return;
        }
    }

    loop {
        tokio::select! {
            // A message from the hub.
            result = rx.recv() => {
                match result {
                    Ok(message) => {
                        let Some(frame) = encode(&message) else {
                            continue;
                        };
                        if socket.send(frame).await.is_err() {
                            debug!(%observer_id, "Observer disconnected (send failed)");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(%observer_id, skipped = n, "Observer lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!(%observer_id, "Hub channel closed, closing observer");
                        break;
                    }
                }
            }
            // Close frames, pings, or a dropped connection from the observer.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%observer_id, "Observer closed connection");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%observer_id, "Observer disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%observer_id, "Observer socket error: {e}");
                        break;
                    }
                    _ => {
                        // Observers have nothing to say; ignore text and binary frames.
                    }
                }
            }
        }
    }

    drop(rx);
    info!(%observer_id, observers = state.observer_count(), "Observer disconnected");
}
