use crate::protocol::{parse_client_message, ErrorCode, ServerMessage};
use crate::server::{GameServer, RegisterClientError};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::sending::{send_immediate_server_message, send_text_message};

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<GameServer>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let queue_capacity = server.config().message_queue_capacity.max(1);
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(queue_capacity);

    let connection_id = match server.register_client(tx, addr) {
        Ok(connection_id) => {
            tracing::info!(%connection_id, client_addr = %addr, "WebSocket connection established");
            connection_id
        }
        Err(err) => {
            let message = match err {
                RegisterClientError::ServerFull { limit } => {
                    format!("Server is full ({limit} connections)")
                }
                RegisterClientError::IpLimitExceeded { current, limit } => {
                    format!("Too many connections from your IP ({current}/{limit})")
                }
            };
            tracing::warn!(client_addr = %addr, error = %err, "Rejected WebSocket connection");
            let error_message = ServerMessage::error(message, ErrorCode::TooManyConnections);
            if let Err(err) = send_immediate_server_message(&mut sender, &error_message).await {
                tracing::debug!(
                    client_addr = %addr,
                    error = %err,
                    "Failed to send connection limit error frame"
                );
            }
            let _ = sender.close().await;
            return;
        }
    };

    // Outgoing messages
    let server_clone = server.clone();
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if send_text_message(&mut sender, &message, &connection_id)
                .await
                .is_err()
            {
                break;
            }
        }
        let _ = sender.close().await;
        server_clone.unregister_client(&connection_id).await;
    });

    // Incoming messages
    let server_clone = server.clone();
    let receive_task = tokio::spawn(async move {
        let max_size = server_clone.config().max_message_size;

        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(%connection_id, "WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    if text.len() > max_size {
                        tracing::warn!(
                            %connection_id,
                            size = text.len(),
                            max = max_size,
                            "Message exceeds size limit"
                        );
                        server_clone.metrics.increment_protocol_errors();
                        server_clone.send_error(
                            &connection_id,
                            format!(
                                "Message too large ({} bytes, max {} bytes)",
                                text.len(),
                                max_size
                            ),
                            ErrorCode::MessageTooLarge,
                        );
                        continue;
                    }

                    match parse_client_message(text.as_str()) {
                        Ok(client_message) => {
                            tracing::debug!(
                                %connection_id,
                                message_type = client_message.type_name(),
                                "Received client message"
                            );
                            server_clone
                                .handle_client_message(&connection_id, client_message)
                                .await;
                        }
                        Err(err) => {
                            tracing::warn!(
                                %connection_id,
                                error = %err,
                                "Rejected client WebSocket frame"
                            );
                            server_clone.metrics.increment_protocol_errors();
                            server_clone.send_error(
                                &connection_id,
                                err.user_message(),
                                err.error_code(),
                            );
                        }
                    }
                }
                Message::Binary(payload) => {
                    tracing::warn!(%connection_id, size = payload.len(), "Binary frame rejected");
                    server_clone.metrics.increment_protocol_errors();
                    server_clone.send_error(
                        &connection_id,
                        "Binary frames are not supported.",
                        ErrorCode::UnsupportedFrame,
                    );
                }
                Message::Close(_) => {
                    tracing::info!(%connection_id, "WebSocket connection closed");
                    break;
                }
                // Control frames are answered by the transport.
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }

        server_clone.unregister_client(&connection_id).await;
    });

    tokio::select! {
        _ = send_task => {
            tracing::debug!(%connection_id, "Send task completed");
        }
        _ = receive_task => {
            tracing::debug!(%connection_id, "Receive task completed");
        }
    }

    server.unregister_client(&connection_id).await;
}
