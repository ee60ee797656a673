use tracing::{debug, error, info};

use super::GameServer;
use crate::database::{DatabaseError, UserRecord};
use crate::game::EndReason;
use crate::protocol::validation::{validate_password_with_config, validate_username_with_config};
use crate::protocol::{ConnectionId, OperationResult, PlayerIdentity, ServerMessage, UserId};
use crate::security::{hash_password, verify_password};

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const ALREADY_LOGGED_IN: &str = "Already logged in.";

impl GameServer {
    pub(super) async fn handle_register(
        &self,
        connection_id: &ConnectionId,
        username: &str,
        password: &str,
    ) {
        let reply = match self.register_account(connection_id, username, password).await {
            Ok(user) => {
                self.metrics.increment_registrations();
                info!(%connection_id, user_id = user.id, username = %user.username, "Account registered");
                OperationResult::success()
            }
            Err(message) => {
                debug!(%connection_id, %username, %message, "Registration rejected");
                OperationResult::failure(message)
            }
        };
        self.send_to_connection(connection_id, ServerMessage::RegisterRes(reply));
    }

    async fn register_account(
        &self,
        connection_id: &ConnectionId,
        username: &str,
        password: &str,
    ) -> Result<UserRecord, String> {
        if self.connection_manager.identity(connection_id).is_some() {
            return Err(ALREADY_LOGGED_IN.to_string());
        }
        validate_username_with_config(username, &self.protocol_config)?;
        validate_password_with_config(password, &self.protocol_config)?;

        let password_hash = hash_password(password);
        self.database
            .create_user(username, &password_hash)
            .await
            .map_err(|err| match err.downcast_ref::<DatabaseError>() {
                Some(DatabaseError::UsernameTaken(_)) => "Username already exists".to_string(),
                _ => {
                    error!(%username, error = %err, "Failed to create account");
                    self.metrics.increment_persistence_failures();
                    "Registration failed.".to_string()
                }
            })
    }

    pub(super) async fn handle_login(
        &self,
        connection_id: &ConnectionId,
        username: &str,
        password: &str,
    ) {
        let reply = match self.login(connection_id, username, password).await {
            Ok(identity) => {
                self.metrics.increment_logins();
                info!(
                    %connection_id,
                    user_id = identity.user_id,
                    username = %identity.username,
                    elo = identity.elo,
                    "Player logged in"
                );
                ServerMessage::login_success(identity.user_id, identity.username, identity.elo)
            }
            Err(message) => {
                self.metrics.increment_login_failures();
                debug!(%connection_id, %username, %message, "Login rejected");
                ServerMessage::login_failure(message)
            }
        };
        self.send_to_connection(connection_id, reply);
    }

    async fn login(
        &self,
        connection_id: &ConnectionId,
        username: &str,
        password: &str,
    ) -> Result<PlayerIdentity, String> {
        if self.connection_manager.identity(connection_id).is_some() {
            return Err(ALREADY_LOGGED_IN.to_string());
        }

        let user = match self.database.get_user_by_username(username).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(INVALID_CREDENTIALS.to_string()),
            Err(err) => {
                error!(%username, error = %err, "Failed to load account");
                self.metrics.increment_persistence_failures();
                return Err("Login failed.".to_string());
            }
        };
        if !verify_password(password, &user.password_hash) {
            return Err(INVALID_CREDENTIALS.to_string());
        }

        let identity = PlayerIdentity {
            user_id: user.id,
            username: user.username,
            elo: user.elo,
        };
        self.connection_manager
            .login(connection_id, identity.clone())
            .map_err(|err| err.to_string())?;
        Ok(identity)
    }

    pub(super) async fn handle_logout(&self, connection_id: &ConnectionId) {
        if let Some(identity) = self.connection_manager.logout(connection_id) {
            self.release_player(connection_id, identity.user_id, EndReason::Resignation)
                .await;
            info!(%connection_id, user_id = identity.user_id, "Player logged out");
        }
        self.send_to_connection(
            connection_id,
            ServerMessage::LogoutRes(OperationResult::success()),
        );
    }

    /// Remove a player that was just unbound from every queue, room and match.
    ///
    /// The connection must no longer be bound to `user_id` when this runs, so a
    /// match created concurrently is caught by its own setup check.
    pub(super) async fn release_player(
        &self,
        connection_id: &ConnectionId,
        user_id: UserId,
        reason: EndReason,
    ) {
        if self
            .matchmaking
            .dequeue(&self.connection_manager, connection_id)
            .await
        {
            debug!(%connection_id, user_id, "Removed player from matchmaking queue");
        }
        if let Some(room) = self.lobbies.close_hosted_by(user_id) {
            info!(%connection_id, user_id, code = %room.code, "Closed room of departing host");
        }
        self.forfeit_active_match(user_id, reason).await;
    }
}
