use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::connection_manager::StatusError;
use super::GameServer;
use crate::protocol::room_codes::generate_clean_room_code_of_length;
use crate::protocol::validation::normalize_room_code;
use crate::protocol::{
    ConnectionId, MatchId, OperationResult, PlayerIdentity, ServerMessage, UserId,
};

const MAX_CODE_ATTEMPTS: usize = 16;

/// A private room waiting for its guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomRoom {
    pub code: String,
    pub host_connection: ConnectionId,
    pub host: PlayerIdentity,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("Not logged in.")]
    NotLoggedIn,
    #[error("Already in queue or in a match.")]
    Busy,
    #[error("You already have an open room.")]
    AlreadyHosting,
    #[error("No free room slots.")]
    Full,
    #[error("Could not allocate a room code.")]
    CodeSpaceExhausted,
    #[error("Room not found.")]
    NotFound,
    #[error("You cannot join your own room.")]
    OwnRoom,
    #[error("Room host is no longer available.")]
    HostUnavailable,
    #[error("Only the host can close this room.")]
    NotHost,
    #[error("Could not start the match.")]
    MatchUnavailable,
}

impl From<StatusError> for LobbyError {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::UnknownConnection | StatusError::NotLoggedIn => Self::NotLoggedIn,
            StatusError::AlreadyQueued | StatusError::InGame => Self::Busy,
        }
    }
}

/// Live custom rooms, keyed by code with a per-host index.
pub(crate) struct LobbyRegistry {
    rooms: DashMap<String, CustomRoom>,
    hosts: DashMap<UserId, String>,
    open: AtomicUsize,
    capacity: usize,
    code_length: usize,
}

impl LobbyRegistry {
    pub fn new(capacity: usize, code_length: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            hosts: DashMap::new(),
            open: AtomicUsize::new(0),
            capacity,
            code_length,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_hosting(&self, user_id: UserId) -> bool {
        self.hosts.contains_key(&user_id)
    }

    pub fn find_by_code(&self, code: &str) -> Option<CustomRoom> {
        self.rooms.get(code).map(|room| room.clone())
    }

    pub fn find_by_host(&self, user_id: UserId) -> Option<CustomRoom> {
        let code = self.hosts.get(&user_id).map(|code| code.clone())?;
        self.find_by_code(&code)
    }

    pub fn create(
        &self,
        host_connection: ConnectionId,
        host: PlayerIdentity,
    ) -> Result<String, LobbyError> {
        let host_slot = match self.hosts.entry(host.user_id) {
            Entry::Occupied(_) => return Err(LobbyError::AlreadyHosting),
            Entry::Vacant(vacant) => vacant,
        };

        let capacity = self.capacity;
        if self
            .open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| {
                (open < capacity).then_some(open + 1)
            })
            .is_err()
        {
            return Err(LobbyError::Full);
        }

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_clean_room_code_of_length(self.code_length);
            if let Entry::Vacant(room_slot) = self.rooms.entry(code.clone()) {
                room_slot.insert(CustomRoom {
                    code: code.clone(),
                    host_connection,
                    host,
                    created_at: Utc::now(),
                });
                host_slot.insert(code.clone());
                return Ok(code);
            }
        }

        self.open.fetch_sub(1, Ordering::AcqRel);
        Err(LobbyError::CodeSpaceExhausted)
    }

    /// Remove the room so `guest` can start a match with its host.
    pub fn take(&self, code: &str, guest: UserId) -> Result<CustomRoom, LobbyError> {
        let (_, room) = self
            .rooms
            .remove_if(code, |_, room| room.host.user_id != guest)
            .ok_or_else(|| {
                if self.rooms.contains_key(code) {
                    LobbyError::OwnRoom
                } else {
                    LobbyError::NotFound
                }
            })?;
        self.forget(&room);
        Ok(room)
    }

    /// Put back a room whose match could not be started.
    pub fn restore(&self, room: CustomRoom) {
        let host_id = room.host.user_id;
        let code = room.code.clone();
        // Lock order matches `create`: host index first, then rooms.
        let host_slot = match self.hosts.entry(host_id) {
            Entry::Occupied(_) => {
                warn!(%code, host_id, "Host opened another room before restore; dropping room");
                return;
            }
            Entry::Vacant(vacant) => vacant,
        };
        match self.rooms.entry(code.clone()) {
            Entry::Occupied(_) => {
                warn!(%code, host_id, "Room code reused before restore; dropping room");
            }
            Entry::Vacant(slot) => {
                slot.insert(room);
                host_slot.insert(code);
                self.open.fetch_add(1, Ordering::AcqRel);
            }
        }
    }

    pub fn close(&self, code: &str, requester: UserId) -> Result<CustomRoom, LobbyError> {
        let (_, room) = self
            .rooms
            .remove_if(code, |_, room| room.host.user_id == requester)
            .ok_or_else(|| {
                if self.rooms.contains_key(code) {
                    LobbyError::NotHost
                } else {
                    LobbyError::NotFound
                }
            })?;
        self.forget(&room);
        Ok(room)
    }

    pub fn close_hosted_by(&self, user_id: UserId) -> Option<CustomRoom> {
        let (_, code) = self.hosts.remove(&user_id)?;
        let (_, room) = self
            .rooms
            .remove_if(&code, |_, room| room.host.user_id == user_id)?;
        self.open.fetch_sub(1, Ordering::AcqRel);
        Some(room)
    }

    fn forget(&self, room: &CustomRoom) {
        self.hosts
            .remove_if(&room.host.user_id, |_, code| *code == room.code);
        self.open.fetch_sub(1, Ordering::AcqRel);
    }
}

impl GameServer {
    pub(super) fn handle_create_room(&self, connection_id: &ConnectionId) {
        let reply = match self.create_room(connection_id) {
            Ok(code) => {
                self.metrics.increment_rooms_created();
                info!(%connection_id, %code, "Custom room created");
                ServerMessage::room_created(code)
            }
            Err(err) => {
                debug!(%connection_id, error = %err, "Room creation rejected");
                ServerMessage::room_creation_failed(err.to_string())
            }
        };
        self.send_to_connection(connection_id, reply);
    }

    fn create_room(&self, connection_id: &ConnectionId) -> Result<String, LobbyError> {
        let status = self
            .connection_manager
            .status(connection_id)
            .ok_or(LobbyError::NotLoggedIn)?;
        let identity = status.identity.clone().ok_or(LobbyError::NotLoggedIn)?;
        if !status.is_idle() {
            return Err(LobbyError::Busy);
        }
        self.lobbies.create(*connection_id, identity)
    }

    pub(super) async fn handle_join_room(&self, connection_id: &ConnectionId, code: &str) {
        match self.join_room(connection_id, code).await {
            Ok(match_id) => {
                self.metrics.increment_rooms_joined();
                info!(%connection_id, match_id, "Custom room joined");
            }
            Err(err) => {
                debug!(%connection_id, error = %err, "Room join rejected");
                self.send_to_connection(
                    connection_id,
                    ServerMessage::JoinRoomRes(OperationResult::failure(err.to_string())),
                );
            }
        }
    }

    async fn join_room(&self, connection_id: &ConnectionId, code: &str) -> Result<MatchId, LobbyError> {
        let connections = &self.connection_manager;
        let status = connections
            .status(connection_id)
            .ok_or(LobbyError::NotLoggedIn)?;
        let guest_id = status.user_id().ok_or(LobbyError::NotLoggedIn)?;
        if !status.is_idle() {
            return Err(LobbyError::Busy);
        }
        if self.lobbies.is_hosting(guest_id) {
            return Err(LobbyError::AlreadyHosting);
        }

        let code = normalize_room_code(code);
        let room = self.lobbies.find_by_code(&code).ok_or(LobbyError::NotFound)?;
        if room.host.user_id == guest_id {
            return Err(LobbyError::OwnRoom);
        }

        let guest = connections.claim_for_match(connection_id)?;
        let room = match self.lobbies.take(&code, guest.user_id) {
            Ok(room) => room,
            Err(err) => {
                connections.release_from_match(connection_id);
                return Err(err);
            }
        };

        let host = match connections.claim_for_match(&room.host_connection) {
            Ok(host) if host.user_id == room.host.user_id => host,
            claimed => {
                // The host connection now belongs to a different account.
                if claimed.is_ok() {
                    connections.release_from_match(&room.host_connection);
                }
                connections.release_from_match(connection_id);
                warn!(code = %room.code, host_id = room.host.user_id, "Room host unavailable at join");
                return Err(LobbyError::HostUnavailable);
            }
        };

        match self
            .start_match(
                (room.host_connection, host),
                (*connection_id, guest),
            )
            .await
        {
            Ok(match_id) => Ok(match_id),
            Err(err) => {
                warn!(code = %room.code, error = %err, "Failed to start custom room match");
                connections.release_from_match(&room.host_connection);
                connections.release_from_match(connection_id);
                self.lobbies.restore(room);
                Err(LobbyError::MatchUnavailable)
            }
        }
    }

    pub(super) fn handle_room_close(&self, connection_id: &ConnectionId, code: &str) {
        let reply = match self.connection_manager.identity(connection_id) {
            None => OperationResult::failure(LobbyError::NotLoggedIn.to_string()),
            Some(identity) => {
                match self
                    .lobbies
                    .close(&normalize_room_code(code), identity.user_id)
                {
                    Ok(room) => {
                        info!(%connection_id, code = %room.code, "Custom room closed");
                        OperationResult::success()
                    }
                    Err(err) => OperationResult::failure(err.to_string()),
                }
            }
        };
        self.send_to_connection(connection_id, ServerMessage::RoomCloseRes(reply));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::room_codes::CLEAN_CHARS;
    use uuid::Uuid;

    fn host(user_id: UserId) -> PlayerIdentity {
        PlayerIdentity {
            user_id,
            username: format!("host{user_id}"),
            elo: 1000,
        }
    }

    #[test]
    fn create_assigns_clean_unique_codes() {
        let registry = LobbyRegistry::new(10, 5);
        let a = registry.create(Uuid::new_v4(), host(1)).unwrap();
        let b = registry.create(Uuid::new_v4(), host(2)).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.len(), 5);
        assert!(a.bytes().all(|byte| CLEAN_CHARS.contains(&byte)));
        assert_eq!(registry.find_by_host(1).map(|room| room.code), Some(a));
    }

    #[test]
    fn one_room_per_host_and_capacity_is_bounded() {
        let registry = LobbyRegistry::new(1, 5);
        registry.create(Uuid::new_v4(), host(1)).unwrap();
        assert_eq!(
            registry.create(Uuid::new_v4(), host(1)),
            Err(LobbyError::AlreadyHosting)
        );
        assert_eq!(registry.create(Uuid::new_v4(), host(2)), Err(LobbyError::Full));

        assert!(registry.close_hosted_by(1).is_some());
        assert!(registry.create(Uuid::new_v4(), host(2)).is_ok());
    }

    #[test]
    fn take_rejects_host_and_unknown_codes() {
        let registry = LobbyRegistry::new(4, 5);
        let code = registry.create(Uuid::new_v4(), host(1)).unwrap();

        assert_eq!(registry.take(&code, 1), Err(LobbyError::OwnRoom));
        assert_eq!(registry.take("ZZZZZ9", 2), Err(LobbyError::NotFound));

        let room = registry.take(&code, 2).unwrap();
        assert!(!registry.is_hosting(1));
        assert_eq!(registry.room_count(), 0);

        registry.restore(room);
        assert!(registry.is_hosting(1));
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn only_host_may_close() {
        let registry = LobbyRegistry::new(4, 5);
        let code = registry.create(Uuid::new_v4(), host(1)).unwrap();

        assert_eq!(registry.close(&code, 2), Err(LobbyError::NotHost));
        assert_eq!(registry.close("NOPE2", 1), Err(LobbyError::NotFound));
        assert_eq!(registry.close(&code, 1).map(|room| room.code), Ok(code));
        assert!(registry.close_hosted_by(1).is_none());
    }

    #[test]
    fn restore_is_dropped_when_host_opened_another_room() {
        let registry = LobbyRegistry::new(4, 5);
        let code = registry.create(Uuid::new_v4(), host(1)).unwrap();
        let room = registry.take(&code, 2).unwrap();

        let replacement = registry.create(Uuid::new_v4(), host(1)).unwrap();
        registry.restore(room);

        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.find_by_host(1).map(|room| room.code), Some(replacement));
    }

    #[test]
    fn restore_and_create_run_concurrently() {
        let registry = std::sync::Arc::new(LobbyRegistry::new(4096, 5));
        let code = registry.create(Uuid::new_v4(), host(1)).unwrap();

        let churn = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for user_id in 100..2100 {
                    registry.create(Uuid::new_v4(), host(user_id)).unwrap();
                    registry.close_hosted_by(user_id).unwrap();
                }
            })
        };
        let rejoin = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for _ in 0..2000 {
                    let room = registry.take(&code, 2).unwrap();
                    registry.restore(room);
                }
            })
        };
        churn.join().unwrap();
        rejoin.join().unwrap();

        assert_eq!(registry.room_count(), 1);
        assert!(registry.is_hosting(1));
    }
}
