use crate::server::GameServer;
use axum::extract::State;
use axum::response::Json;
use std::sync::Arc;

/// Point-in-time counters plus live gauges read from the server tables.
pub async fn metrics_handler(State(server): State<Arc<GameServer>>) -> Json<serde_json::Value> {
    let snapshot = server.metrics().snapshot();

    Json(serde_json::json!({
        "timestamp": snapshot.timestamp.to_rfc3339(),
        "live": {
            "connections": server.connection_count(),
            "queued_players": server.queue_len().await,
            "open_rooms": server.room_count(),
            "active_matches": server.active_match_count(),
        },
        "counters": snapshot,
    }))
}
