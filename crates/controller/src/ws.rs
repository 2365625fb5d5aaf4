//! Websocket bridge between the in-process bus and remote displays.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use shared::{
    bus::{BroadcastBus, SyncChannel},
    protocol::{CommandSource, PidsMessage},
};
use tracing::debug;

#[derive(Clone)]
pub struct AppState {
    pub bus: BroadcastBus,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

/// Only what displays consume goes downstream.
fn forward_to_display(message: &PidsMessage) -> bool {
    matches!(message, PidsMessage::Sync(_) | PidsMessage::UiCommand { .. })
}

/// Decodes an inbound frame. SYNC and controller-tagged UI_COMMAND are
/// controller-only and never accepted from a socket.
pub(crate) fn decode_inbound(text: &str) -> Option<PidsMessage> {
    match serde_json::from_str::<PidsMessage>(text) {
        Ok(PidsMessage::Sync(_)) => {
            debug!("dropping SYNC sent by a remote peer");
            None
        }
        Ok(PidsMessage::UiCommand {
            cmd,
            src: CommandSource::Controller,
        }) => {
            debug!(?cmd, "dropping controller window command sent by a remote peer");
            None
        }
        Ok(message) => Some(message),
        Err(error) => {
            debug!(%error, "dropping malformed frame");
            None
        }
    }
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let mut outbound = state.bus.subscribe();

    let send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if !forward_to_display(&message) {
                continue;
            }
            let text = match serde_json::to_string(&message) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Late joiners get a SYNC without having to ask.
    state.bus.publish(PidsMessage::RequestState);
    debug!("display attached");

    while let Some(Ok(frame)) = receiver.next().await {
        match frame {
            Message::Text(text) => {
                if let Some(message) = decode_inbound(&text) {
                    state.bus.publish(message);
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    debug!("display detached");
}

#[cfg(test)]
#[path = "tests/ws_tests.rs"]
mod tests;
