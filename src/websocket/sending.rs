use crate::protocol::{ConnectionId, ServerMessage};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

/// Write a message directly to the socket, before the connection has a send task.
pub(super) async fn send_immediate_server_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize server message");
            r#"{"type":"ERROR","message":"Internal error","error_code":"INTERNAL_ERROR"}"#
                .to_string()
        }
    };

    sender.send(Message::Text(payload.into())).await
}

/// Returns `Err` once the peer is gone; serialization failures only drop the message.
pub(super) async fn send_text_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
    connection_id: &ConnectionId,
) -> Result<(), ()> {
    let json_message = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(%connection_id, "Failed to serialize message: {}", e);
            return Ok(());
        }
    };

    if sender
        .send(Message::Text(json_message.into()))
        .await
        .is_err()
    {
        tracing::warn!(%connection_id, "Failed to send message, connection closed");
        return Err(());
    }

    Ok(())
}
