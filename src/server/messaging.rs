use super::GameServer;
use crate::protocol::{ConnectionId, ErrorCode, ServerMessage, UserId};
use std::sync::Arc;

impl GameServer {
    /// Queue a message for one connection. Returns false if it was dropped.
    pub fn send_to_connection(&self, connection_id: &ConnectionId, message: ServerMessage) -> bool {
        self.connection_manager
            .send(connection_id, Arc::new(message))
    }

    /// Queue a message for whichever connection `user_id` is logged in on.
    pub fn send_to_user(&self, user_id: UserId, message: Arc<ServerMessage>) -> bool {
        match self.connection_manager.connection_for_user(user_id) {
            Some(connection_id) => self.connection_manager.send(&connection_id, message),
            None => {
                tracing::debug!(user_id, "User is not connected; message dropped");
                false
            }
        }
    }

    pub(super) fn broadcast_to_users(&self, user_ids: &[UserId], message: ServerMessage) {
        let message = Arc::new(message);
        for user_id in user_ids {
            self.send_to_user(*user_id, Arc::clone(&message));
        }
    }

    /// Send an error message to a specific connection, tracking back-pressure metrics.
    pub fn send_error(
        &self,
        connection_id: &ConnectionId,
        message: impl Into<String>,
        error_code: ErrorCode,
    ) -> bool {
        self.send_to_connection(connection_id, ServerMessage::error(message, error_code))
    }
}
