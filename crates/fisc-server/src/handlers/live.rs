//! WebSocket live-event channel

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use tracing::debug;

use crate::{AppState, AuthUser};

/// GET /api/events - Subscribe to the live event stream
pub async fn events_ws(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, user, socket))
}

async fn handle_socket(state: Arc<AppState>, user: AuthUser, socket: WebSocket) {
    let (id, mut events) = state.events.subscribe();
    debug!(subscriber = id, user_id = user.0, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    // Inbound payloads are ignored; the channel is push-only.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.events.unsubscribe(id);
    debug!(subscriber = id, user_id = user.0, "WebSocket disconnected");
}
