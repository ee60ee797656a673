use crate::server::GameServer;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;

use super::connection::handle_socket;

/// WebSocket handler for the game protocol
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<GameServer>>,
) -> Response {
    // Frames above the limit are answered with MESSAGE_TOO_LARGE instead of being cut off
    // by the transport, so leave headroom above the protocol limit.
    let frame_limit = server.config().max_message_size.saturating_mul(4).max(1024);
    ws.max_message_size(frame_limit)
        .on_upgrade(move |socket| handle_socket(socket, server, addr))
}
