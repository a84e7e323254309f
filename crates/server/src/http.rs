//! HTTP/WS surface (spec §6): intentionally thin, since the wire format
//! itself is explicitly out of the runtime core's contract. Proves the
//! wiring with a status probe and a raw event feed.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct SystemStatus {
    performance_tier: avatar_config::PerformanceTier,
    active_pipelines: usize,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(SystemStatus {
        performance_tier: state.host_profile.performance_tier,
        active_pipelines: state.pipelines.len(),
    })
}

/// Upgrades the connection and forwards every bus event as a JSON text
/// frame until the client disconnects.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| forward_events(socket, state))
}

async fn forward_events(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let sub = state.bus.subscribe();

    loop {
        tokio::select! {
            event = sub.recv() => {
                let frame = match serde_json::to_string(&event) {
                    Ok(json) => Message::Text(json),
                    Err(e) => {
                        debug!("failed to encode bus event for /ws: {e}");
                        continue;
                    }
                };
                if sink.send(frame).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}
