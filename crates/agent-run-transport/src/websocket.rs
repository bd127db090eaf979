//! Per-session outward event channel over WebSocket.

use std::sync::Arc;

use agent_run_core::EventStore;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};

use crate::{identity::ensure_session_id, routes::AppState};

/// WebSocket upgrade handler for `/ws`.
///
/// The channel is push-only: events flow out in per-run emission order,
/// history first, then live. Client input other than close is ignored.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let identity = ensure_session_id(&headers);
    let store = state.registry.event_store(identity.id);
    tracing::debug!(session_id = %identity.id, "event channel connected");
    ws.on_upgrade(move |socket| push_events(socket, store))
}

async fn push_events(socket: WebSocket, store: Arc<EventStore>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = store.history_plus_stream();

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                let json = match serde_json::to_string(&event) {
                    Ok(j) => j,
                    Err(e) => {
                        tracing::error!("Failed to serialize event: {e}");
                        continue;
                    }
                };
                // Best-effort push; a dead consumer just ends the stream.
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {e}");
                        break;
                    }
                }
            }
        }
    }
}
