use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics::ServerMetrics;
use crate::protocol::{ConnectionId, PlayerIdentity, ServerMessage, UserId};

use super::RegisterClientError;

#[derive(Debug, Clone)]
pub(crate) struct ClientConnection {
    pub sender: mpsc::Sender<Arc<ServerMessage>>,
    pub client_addr: SocketAddr,
    /// Set by a successful login, cleared by logout.
    pub identity: Option<PlayerIdentity>,
    pub in_queue: bool,
    pub in_game: bool,
    pub connected_at: Instant,
}

/// Point-in-time view of one connection's player record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStatus {
    pub connection_id: ConnectionId,
    pub identity: Option<PlayerIdentity>,
    pub in_queue: bool,
    pub in_game: bool,
}

impl PlayerStatus {
    pub fn is_logged_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.identity.as_ref().map(|identity| identity.user_id)
    }

    pub fn is_idle(&self) -> bool {
        self.is_logged_in() && !self.in_queue && !self.in_game
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("connection is not registered")]
    UnknownConnection,
    #[error("Already logged in.")]
    AlreadyLoggedIn,
    #[error("Account is already logged in elsewhere.")]
    AccountInUse,
}

/// Why a status transition on a player record was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("connection is not registered")]
    UnknownConnection,
    #[error("Not logged in.")]
    NotLoggedIn,
    #[error("Already in queue.")]
    AlreadyQueued,
    #[error("Already in a match.")]
    InGame,
}

pub(crate) struct ConnectionManager {
    clients: DashMap<ConnectionId, ClientConnection>,
    users: DashMap<UserId, ConnectionId>,
    connections_per_ip: DashMap<IpAddr, usize>,
    active: AtomicUsize,
    metrics: Arc<ServerMetrics>,
    max_connections: usize,
    max_connections_per_ip: usize,
}

impl ConnectionManager {
    pub fn new(
        max_connections: usize,
        max_connections_per_ip: usize,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            clients: DashMap::new(),
            users: DashMap::new(),
            connections_per_ip: DashMap::new(),
            active: AtomicUsize::new(0),
            metrics,
            max_connections,
            max_connections_per_ip,
        }
    }

    pub fn register_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) -> Result<ConnectionId, RegisterClientError> {
        let max = self.max_connections;
        if self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < max).then_some(current + 1)
            })
            .is_err()
        {
            warn!(client_addr = %client_addr, max, "Connection limit reached");
            self.metrics.increment_rejected_connections();
            return Err(RegisterClientError::ServerFull { limit: max });
        }

        let ip = client_addr.ip();
        if let Err(current) = self.try_reserve_ip_slot(ip) {
            self.active.fetch_sub(1, Ordering::AcqRel);
            warn!(
                %ip,
                current,
                max = self.max_connections_per_ip,
                "IP connection limit exceeded"
            );
            self.metrics.increment_rejected_connections();
            return Err(RegisterClientError::IpLimitExceeded {
                current,
                limit: self.max_connections_per_ip,
            });
        }

        let connection_id = Uuid::new_v4();
        self.clients.insert(
            connection_id,
            ClientConnection {
                sender,
                client_addr,
                identity: None,
                in_queue: false,
                in_game: false,
                connected_at: Instant::now(),
            },
        );
        self.metrics.increment_connections();

        info!(%connection_id, client_addr = %client_addr, "Client registered");
        Ok(connection_id)
    }

    /// Drop the record. Idempotent; callers run the session/queue/lobby teardown first.
    pub fn remove_client(&self, connection_id: &ConnectionId) -> Option<ClientConnection> {
        let (_, connection) = self.clients.remove(connection_id)?;
        if let Some(identity) = &connection.identity {
            self.users
                .remove_if(&identity.user_id, |_, owner| owner == connection_id);
        }
        self.release_ip_slot(connection.client_addr.ip());
        self.active.fetch_sub(1, Ordering::AcqRel);
        Some(connection)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn identity(&self, connection_id: &ConnectionId) -> Option<PlayerIdentity> {
        self.clients
            .get(connection_id)
            .and_then(|client| client.identity.clone())
    }

    pub fn status(&self, connection_id: &ConnectionId) -> Option<PlayerStatus> {
        self.clients.get(connection_id).map(|client| PlayerStatus {
            connection_id: *connection_id,
            identity: client.identity.clone(),
            in_queue: client.in_queue,
            in_game: client.in_game,
        })
    }

    pub fn connection_for_user(&self, user_id: UserId) -> Option<ConnectionId> {
        self.users.get(&user_id).map(|entry| *entry.value())
    }

    /// True while `connection_id` is live and logged in as `user_id`.
    pub fn is_bound(&self, connection_id: &ConnectionId, user_id: UserId) -> bool {
        self.clients
            .get(connection_id)
            .and_then(|client| client.identity.as_ref().map(|id| id.user_id == user_id))
            .unwrap_or(false)
    }

    pub fn login(
        &self,
        connection_id: &ConnectionId,
        identity: PlayerIdentity,
    ) -> Result<(), LoginError> {
        // The users shard stays locked until the connection record is updated, so a
        // concurrent removal either sees the identity or makes this login fail.
        match self.users.entry(identity.user_id) {
            Entry::Occupied(_) => Err(LoginError::AccountInUse),
            Entry::Vacant(vacant) => {
                let mut client = self
                    .clients
                    .get_mut(connection_id)
                    .ok_or(LoginError::UnknownConnection)?;
                if client.identity.is_some() {
                    return Err(LoginError::AlreadyLoggedIn);
                }
                client.identity = Some(identity);
                client.in_queue = false;
                client.in_game = false;
                drop(client);
                vacant.insert(*connection_id);
                Ok(())
            }
        }
    }

    /// Clear the identity and every flag. Returns the identity that was cleared.
    pub fn logout(&self, connection_id: &ConnectionId) -> Option<PlayerIdentity> {
        let identity = {
            let mut client = self.clients.get_mut(connection_id)?;
            client.in_queue = false;
            client.in_game = false;
            client.identity.take()
        }?;
        self.users
            .remove_if(&identity.user_id, |_, owner| owner == connection_id);
        Some(identity)
    }

    /// Logged in, idle → queued.
    pub fn try_mark_queued(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<PlayerIdentity, StatusError> {
        let mut client = self
            .clients
            .get_mut(connection_id)
            .ok_or(StatusError::UnknownConnection)?;
        let identity = client.identity.clone().ok_or(StatusError::NotLoggedIn)?;
        if client.in_game {
            return Err(StatusError::InGame);
        }
        if client.in_queue {
            return Err(StatusError::AlreadyQueued);
        }
        client.in_queue = true;
        Ok(identity)
    }

    pub fn clear_queued(&self, connection_id: &ConnectionId) -> bool {
        self.clients
            .get_mut(connection_id)
            .map(|mut client| std::mem::replace(&mut client.in_queue, false))
            .unwrap_or(false)
    }

    /// Queued → in game, provided the record still belongs to `user_id`.
    pub fn promote_to_match(
        &self,
        connection_id: &ConnectionId,
        user_id: UserId,
    ) -> Option<PlayerIdentity> {
        let mut client = self.clients.get_mut(connection_id)?;
        let identity = client.identity.clone()?;
        if identity.user_id != user_id || !client.in_queue || client.in_game {
            return None;
        }
        client.in_queue = false;
        client.in_game = true;
        Some(identity)
    }

    /// Idle → in game. Used when a lobby join pairs two players directly.
    pub fn claim_for_match(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<PlayerIdentity, StatusError> {
        let mut client = self
            .clients
            .get_mut(connection_id)
            .ok_or(StatusError::UnknownConnection)?;
        let identity = client.identity.clone().ok_or(StatusError::NotLoggedIn)?;
        if client.in_game {
            return Err(StatusError::InGame);
        }
        if client.in_queue {
            return Err(StatusError::AlreadyQueued);
        }
        client.in_game = true;
        Ok(identity)
    }

    pub fn release_from_match(&self, connection_id: &ConnectionId) {
        if let Some(mut client) = self.clients.get_mut(connection_id) {
            client.in_game = false;
        }
    }

    /// In game → queued, for a pairing that could not be completed.
    pub fn return_to_queue(&self, connection_id: &ConnectionId, user_id: UserId) -> bool {
        let Some(mut client) = self.clients.get_mut(connection_id) else {
            return false;
        };
        if client.identity.as_ref().map(|id| id.user_id) != Some(user_id) {
            return false;
        }
        client.in_game = false;
        client.in_queue = true;
        true
    }

    /// Apply a finished match to the user's live record, if they are still connected.
    pub fn finish_match_for(&self, user_id: UserId, new_elo: i32) -> Option<ConnectionId> {
        let connection_id = self.connection_for_user(user_id)?;
        let mut client = self.clients.get_mut(&connection_id)?;
        let identity = client.identity.as_mut()?;
        if identity.user_id != user_id {
            return None;
        }
        identity.elo = new_elo;
        client.in_game = false;
        Some(connection_id)
    }

    /// Best-effort delivery. Returns false when the message was dropped.
    pub fn send(&self, connection_id: &ConnectionId, message: Arc<ServerMessage>) -> bool {
        let Some(sender) = self
            .clients
            .get(connection_id)
            .map(|client| client.sender.clone())
        else {
            return false;
        };

        match sender.try_send(message) {
            Ok(()) => true,
            Err(err) => {
                if matches!(err, TrySendError::Full(_)) {
                    self.metrics.increment_websocket_messages_dropped();
                }
                warn!(%connection_id, error = %err, "Failed to enqueue message for client");
                false
            }
        }
    }

    fn try_reserve_ip_slot(&self, ip: IpAddr) -> Result<usize, usize> {
        match self.connections_per_ip.entry(ip) {
            Entry::Occupied(mut entry) => {
                let current = *entry.get();
                if current >= self.max_connections_per_ip {
                    Err(current)
                } else {
                    let count = entry.get_mut();
                    *count += 1;
                    Ok(*count)
                }
            }
            Entry::Vacant(entry) => {
                if self.max_connections_per_ip == 0 {
                    Err(0)
                } else {
                    entry.insert(1);
                    Ok(1)
                }
            }
        }
    }

    fn release_ip_slot(&self, ip: IpAddr) {
        if let Some(mut entry) = self.connections_per_ip.get_mut(&ip) {
            if *entry > 1 {
                *entry -= 1;
                return;
            }
        }
        self.connections_per_ip.remove(&ip);
    }
}
