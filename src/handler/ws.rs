// handler/ws.rs
use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::time::{interval, Duration};

use crate::{middleware::JWTAuthMiddeware, service::notification_service::NotificationHub, AppState};

const HEARTBEAT_SECS: u64 = 30;

pub fn ws_handler() -> Router {
    Router::new().route("/", get(ws_upgrade))
}

pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> impl IntoResponse {
    let hub = app_state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub, auth))
}

/// Forwards the connection's queue to the socket until either side closes.
async fn handle_socket(socket: WebSocket, hub: Arc<NotificationHub>, auth: JWTAuthMiddeware) {
    let (connection_id, mut events) = hub.register(auth.user_id);
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = interval(Duration::from_secs(HEARTBEAT_SECS));
        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!("Failed to serialize {} event: {}", event.kind(), e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sender.close().await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    hub.unregister(connection_id);
    tracing::debug!("WebSocket closed for user {}", auth.user_id);
}
