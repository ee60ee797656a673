use crate::protocol::{ClientMessage, ConnectionId, ServerMessage};

use super::GameServer;

impl GameServer {
    /// Dispatch one parsed request. Requests from a single connection are handled in order.
    pub async fn handle_client_message(&self, connection_id: &ConnectionId, message: ClientMessage) {
        tracing::trace!(%connection_id, message_type = message.type_name(), "Handling client message");
        match message {
            ClientMessage::RegisterReq { username, password } => {
                self.handle_register(connection_id, &username, &password)
                    .await;
            }
            ClientMessage::LoginReq { username, password } => {
                self.handle_login(connection_id, &username, &password).await;
            }
            ClientMessage::Logout => {
                self.handle_logout(connection_id).await;
            }
            ClientMessage::QueueEnterReq => {
                self.handle_queue_enter(connection_id).await;
            }
            ClientMessage::QueueExitReq => {
                self.handle_queue_exit(connection_id).await;
            }
            ClientMessage::CreateRoomReq => {
                self.handle_create_room(connection_id);
            }
            ClientMessage::JoinRoomReq { code } => {
                self.handle_join_room(connection_id, &code).await;
            }
            ClientMessage::RoomCloseReq { code } => {
                self.handle_room_close(connection_id, &code);
            }
            ClientMessage::PlaceShip {
                match_id,
                user_id,
                ships,
            } => {
                self.handle_place_ship(connection_id, match_id, user_id, &ships);
            }
            ClientMessage::MoveReq { match_id, row, col } => {
                self.handle_move(connection_id, match_id, row, col).await;
            }
            ClientMessage::ResignReq { match_id, user_id } => {
                self.handle_resign(connection_id, match_id, user_id).await;
            }
            ClientMessage::Ping => {
                self.send_to_connection(connection_id, ServerMessage::Pong);
            }
        }
    }
}
