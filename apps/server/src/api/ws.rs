use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use serde_json::json;
use tracing::{debug, warn};

use bondboard_core::bonds::TransactionStore;

use crate::state::AppState;

const INITIAL_TRANSACTIONS: i64 = 100;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| client_loop(socket, state))
}

/// Sends a snapshot of recent transactions, then forwards every
/// broadcast payload until either side hangs up.
async fn client_loop(mut socket: WebSocket, state: Arc<AppState>) {
    match state.bonds.list_transactions(INITIAL_TRANSACTIONS) {
        Ok(transactions) => {
            let initial = json!({ "type": "initial_data", "data": transactions });
            if socket.send(Message::Text(initial.to_string().into())).await.is_err() {
                return;
            }
        }
        Err(e) => warn!("skipping initial websocket snapshot: {e}"),
    }

    let mut rx = state.broadcaster.subscribe();
    loop {
        tokio::select! {
            payload = rx.recv() => {
                let Some(payload) = payload else { break };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
        }
    }
    debug!("websocket client disconnected");
}
