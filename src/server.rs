use crate::config::{Config, ProtocolConfig};
use crate::database::{create_database, DatabaseConfig, GameDatabase};
use crate::game::{EndReason, SessionPhase};
use crate::metrics::ServerMetrics;
use crate::protocol::{ConnectionId, MatchId, ServerMessage, UserId};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

mod account_service;
mod connection_manager;
mod lobby_service;
mod match_service;
mod matchmaking;
#[cfg(test)]
mod matchmaking_tests;
mod message_router;
mod messaging;
#[cfg(test)]
mod test_support;

use connection_manager::ConnectionManager;
use lobby_service::LobbyRegistry;
use match_service::SessionTable;
use matchmaking::MatchmakingQueue;

pub use connection_manager::{LoginError, PlayerStatus, StatusError};
pub use lobby_service::{CustomRoom, LobbyError};
pub use match_service::StartMatchError;
pub use matchmaking::{find_compatible_pairs, QueueError, WaitingEntry};

/// Authoritative battleship server state shared by every connection task.
pub struct GameServer {
    /// Accounts, match history and move logs
    database: Arc<dyn GameDatabase>,
    /// Live connections and their player records
    pub(crate) connection_manager: ConnectionManager,
    /// Rated matchmaking queue
    matchmaking: MatchmakingQueue,
    /// Custom rooms waiting for a guest
    lobbies: LobbyRegistry,
    /// Live match sessions
    sessions: SessionTable,
    config: ServerConfig,
    protocol_config: ProtocolConfig,
    pub(crate) metrics: Arc<ServerMetrics>,
    /// Cancelled on shutdown; stops background tasks.
    shutdown: CancellationToken,
}

#[derive(Debug, Error)]
pub enum RegisterClientError {
    #[error("server is at its connection limit ({limit})")]
    ServerFull { limit: usize },
    #[error("IP {current} connections exceeds limit {limit}")]
    IpLimitExceeded { current: usize, limit: usize },
}

/// Runtime limits, flattened from the file configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_connections: usize,
    pub max_connections_per_ip: usize,
    pub max_matches: usize,
    pub max_rooms: usize,
    pub max_queue_size: usize,
    pub matchmaking_interval: Duration,
    pub max_elo_gap: i32,
    pub k_factor: f64,
    pub max_message_size: usize,
    pub message_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ServerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_connections: config.security.max_connections,
            max_connections_per_ip: config.security.max_connections_per_ip,
            max_matches: config.server.max_matches,
            max_rooms: config.server.max_rooms,
            max_queue_size: config.matchmaking.max_queue_size,
            matchmaking_interval: config.matchmaking.interval(),
            max_elo_gap: config.matchmaking.max_elo_gap,
            k_factor: config.matchmaking.k_factor,
            max_message_size: config.security.max_message_size,
            message_queue_capacity: config.server.message_queue_capacity,
        }
    }
}

impl GameServer {
    pub async fn new(
        config: ServerConfig,
        protocol_config: ProtocolConfig,
        database_config: DatabaseConfig,
    ) -> anyhow::Result<Arc<Self>> {
        let database: Arc<dyn GameDatabase> = Arc::from(create_database(database_config).await?);
        Ok(Self::with_database(config, protocol_config, database))
    }

    /// Build a server around an existing persistence backend.
    pub fn with_database(
        config: ServerConfig,
        protocol_config: ProtocolConfig,
        database: Arc<dyn GameDatabase>,
    ) -> Arc<Self> {
        let metrics = Arc::new(ServerMetrics::new());
        Arc::new(Self {
            database,
            connection_manager: ConnectionManager::new(
                config.max_connections,
                config.max_connections_per_ip,
                metrics.clone(),
            ),
            matchmaking: MatchmakingQueue::new(config.max_queue_size),
            lobbies: LobbyRegistry::new(config.max_rooms, protocol_config.room_code_length),
            sessions: SessionTable::new(config.max_matches),
            config,
            protocol_config,
            metrics,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn register_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) -> Result<ConnectionId, RegisterClientError> {
        self.connection_manager.register_client(sender, client_addr)
    }

    /// Tear down a closed connection. A live match is lost by the departing player.
    pub async fn unregister_client(&self, connection_id: &ConnectionId) {
        let Some(connection) = self.connection_manager.remove_client(connection_id) else {
            return;
        };
        self.metrics.decrement_active_connections();

        if let Some(identity) = connection.identity {
            self.release_player(connection_id, identity.user_id, EndReason::Disconnect)
                .await;
        }

        tracing::info!(
            %connection_id,
            client_addr = %connection.client_addr,
            connected_for_ms = connection.connected_at.elapsed().as_millis() as u64,
            "Client unregistered"
        );
    }

    /// Start the periodic matchmaking sweep. It stops when [`GameServer::shutdown`] is called.
    pub fn spawn_matchmaking(self: &Arc<Self>) -> JoinHandle<()> {
        let server = Arc::clone(self);
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(server.config.matchmaking_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        tracing::info!("Matchmaking sweep stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        server.run_matchmaking_sweep().await;
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn player_status(&self, connection_id: &ConnectionId) -> Option<PlayerStatus> {
        self.connection_manager.status(connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connection_manager.client_count()
    }

    pub async fn queue_len(&self) -> usize {
        self.matchmaking.len().await
    }

    pub async fn queued_players(&self) -> Vec<WaitingEntry> {
        self.matchmaking.snapshot().await
    }

    pub fn active_match_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn active_match_for(&self, user_id: UserId) -> Option<MatchId> {
        self.sessions.match_for_user(user_id)
    }

    pub fn match_phase(&self, match_id: MatchId) -> Option<SessionPhase> {
        self.sessions.phase(match_id)
    }

    pub fn room_count(&self) -> usize {
        self.lobbies.room_count()
    }

    pub fn find_room(&self, code: &str) -> Option<CustomRoom> {
        self.lobbies.find_by_code(code)
    }

    /// The open room hosted by `user_id`, if any.
    pub fn hosted_room(&self, user_id: UserId) -> Option<CustomRoom> {
        self.lobbies.find_by_host(user_id)
    }

    pub async fn health_check(&self) -> bool {
        self.database.health_check().await
    }

    pub fn database(&self) -> &dyn GameDatabase {
        self.database.as_ref()
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn protocol_config(&self) -> &ProtocolConfig {
        &self.protocol_config
    }

    /// Get server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }
}
