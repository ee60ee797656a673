use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rand::RngExt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::GameServer;
use crate::database::{NewMove, RatingUpdate};
use crate::game::{
    rate_match, EndReason, FleetPlacement, GameScore, MatchSession, Participant, Resolution, Seat,
    SessionError, SessionPhase,
};
use crate::protocol::{
    ConnectionId, ErrorCode, MatchId, OperationResult, PlayerIdentity, PlayerResult,
    ServerMessage, UserId,
};

#[derive(Debug, Error)]
pub enum StartMatchError {
    #[error("match capacity reached ({limit})")]
    CapacityReached { limit: usize },
    #[error("failed to create match record: {0:#}")]
    Storage(anyhow::Error),
}

/// Live sessions keyed by match id, with a per-user index.
pub(crate) struct SessionTable {
    sessions: DashMap<MatchId, MatchSession>,
    by_user: DashMap<UserId, MatchId>,
    reserved: AtomicUsize,
    capacity: usize,
}

impl SessionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            by_user: DashMap::new(),
            reserved: AtomicUsize::new(0),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Claim a slot before the match row is created.
    pub fn try_reserve(&self) -> bool {
        let capacity = self.capacity;
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |reserved| {
                (reserved < capacity).then_some(reserved + 1)
            })
            .is_ok()
    }

    pub fn release_reservation(&self) {
        let _ = self
            .reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |reserved| {
                reserved.checked_sub(1)
            });
    }

    pub fn insert(&self, session: MatchSession) {
        let match_id = session.match_id();
        for participant in session.participants() {
            self.by_user.insert(participant.user_id, match_id);
        }
        self.sessions.insert(match_id, session);
    }

    pub fn match_for_user(&self, user_id: UserId) -> Option<MatchId> {
        self.by_user.get(&user_id).map(|entry| *entry.value())
    }

    pub fn phase(&self, match_id: MatchId) -> Option<SessionPhase> {
        self.sessions.get(&match_id).map(|session| session.phase())
    }

    /// Run `f` with exclusive access to the session. No `.await` may happen inside.
    pub fn with_session<R>(
        &self,
        match_id: MatchId,
        f: impl FnOnce(&mut MatchSession) -> R,
    ) -> Option<R> {
        self.sessions
            .get_mut(&match_id)
            .map(|mut session| f(&mut session))
    }

    pub fn remove(&self, match_id: MatchId) -> Option<MatchSession> {
        let (_, session) = self.sessions.remove(&match_id)?;
        for participant in session.participants() {
            self.by_user
                .remove_if(&participant.user_id, |_, current| *current == match_id);
        }
        self.release_reservation();
        Some(session)
    }
}

fn participant(identity: &PlayerIdentity) -> Participant {
    Participant {
        user_id: identity.user_id,
        username: identity.username.clone(),
        rating: identity.elo,
    }
}

pub(crate) fn session_error_code(err: &SessionError) -> ErrorCode {
    match err {
        SessionError::MatchNotFound => ErrorCode::MatchNotFound,
        SessionError::NotParticipant => ErrorCode::NotInMatch,
        SessionError::NotStarted => ErrorCode::MatchNotStarted,
        SessionError::NotYourTurn => ErrorCode::NotYourTurn,
        SessionError::InvalidMove(_) => ErrorCode::InvalidMove,
        SessionError::AlreadyFinished => ErrorCode::MatchFinished,
        SessionError::FleetAlreadyPlaced | SessionError::PlacementClosed => ErrorCode::InvalidInput,
    }
}

fn both_players(session: &MatchSession) -> [UserId; 2] {
    [
        session.participant(Seat::First).user_id,
        session.participant(Seat::Second).user_id,
    ]
}

impl GameServer {
    /// Create the stored match and the live session, then announce it to both players.
    ///
    /// Both connections must already be marked in game. The first tuple becomes player 1.
    pub(super) async fn start_match(
        &self,
        first: (ConnectionId, PlayerIdentity),
        second: (ConnectionId, PlayerIdentity),
    ) -> Result<MatchId, StartMatchError> {
        if !self.sessions.try_reserve() {
            return Err(StartMatchError::CapacityReached {
                limit: self.sessions.capacity(),
            });
        }

        let record = match self
            .database
            .create_match(first.1.user_id, second.1.user_id)
            .await
        {
            Ok(record) => record,
            Err(err) => {
                self.sessions.release_reservation();
                self.metrics.increment_persistence_failures();
                return Err(StartMatchError::Storage(err));
            }
        };

        let match_id = record.id;
        let first_turn = if rand::rng().random_range(0..2) == 0 {
            first.1.user_id
        } else {
            second.1.user_id
        };
        self.sessions.insert(MatchSession::new(
            match_id,
            participant(&first.1),
            participant(&second.1),
            first_turn,
        ));
        self.metrics.increment_matches_created();
        info!(
            match_id,
            player1 = %first.1.username,
            player2 = %second.1.username,
            first_turn,
            "Match created"
        );

        let found = Arc::new(ServerMessage::MatchFound {
            match_id,
            player1: first.1.username.clone(),
            player2: second.1.username.clone(),
            first_turn,
        });
        self.connection_manager.send(&first.0, Arc::clone(&found));
        self.connection_manager.send(&second.0, found);

        // A player whose teardown ran before the session became visible would
        // otherwise leave it orphaned.
        for (connection_id, identity) in [&first, &second] {
            if !self
                .connection_manager
                .is_bound(connection_id, identity.user_id)
            {
                warn!(match_id, user_id = identity.user_id, "Player left during match setup");
                self.forfeit_active_match(identity.user_id, EndReason::Disconnect)
                    .await;
                break;
            }
        }

        Ok(match_id)
    }

    pub(super) fn handle_place_ship(
        &self,
        connection_id: &ConnectionId,
        match_id: MatchId,
        user_id: UserId,
        ships: &FleetPlacement,
    ) {
        match self.place_fleet(connection_id, match_id, user_id, ships) {
            Ok(started) => {
                info!(%connection_id, match_id, user_id, "Fleet placed");
                self.send_to_connection(
                    connection_id,
                    ServerMessage::PlaceShipRes(OperationResult::success()),
                );
                if let Some((current_turn, players)) = started {
                    info!(match_id, current_turn, "Match started");
                    self.broadcast_to_users(
                        &players,
                        ServerMessage::MatchStart {
                            match_id,
                            current_turn,
                        },
                    );
                }
            }
            Err(message) => {
                debug!(%connection_id, match_id, %message, "Fleet placement rejected");
                self.send_to_connection(
                    connection_id,
                    ServerMessage::PlaceShipRes(OperationResult::failure(message)),
                );
            }
        }
    }

    /// Returns the opening turn and both players once the second fleet lands.
    fn place_fleet(
        &self,
        connection_id: &ConnectionId,
        match_id: MatchId,
        user_id: UserId,
        ships: &FleetPlacement,
    ) -> Result<Option<(UserId, [UserId; 2])>, String> {
        let identity = self
            .connection_manager
            .identity(connection_id)
            .ok_or_else(|| "Not logged in.".to_string())?;
        if identity.user_id != user_id {
            return Err(SessionError::NotParticipant.to_string());
        }
        let board = ships
            .build_board()
            .map_err(|err| format!("Invalid ship placement: {err}."))?;

        self.sessions
            .with_session(match_id, |session| -> Result<_, SessionError> {
                let ready = session.submit_fleet(user_id, board)?;
                Ok(if ready {
                    session
                        .start()
                        .map(|current_turn| (current_turn, both_players(session)))
                } else {
                    None
                })
            })
            .unwrap_or(Err(SessionError::MatchNotFound))
            .map_err(|err| err.to_string())
    }

    pub(super) async fn handle_move(
        &self,
        connection_id: &ConnectionId,
        match_id: MatchId,
        row: i32,
        col: i32,
    ) {
        let Some(identity) = self.connection_manager.identity(connection_id) else {
            self.send_error(connection_id, "Not logged in.", ErrorCode::NotLoggedIn);
            return;
        };

        let attempt = self
            .sessions
            .with_session(match_id, |session| {
                session
                    .attack(identity.user_id, row, col)
                    .map(|report| (report, both_players(session)))
            })
            .unwrap_or(Err(SessionError::MatchNotFound));

        let (report, players) = match attempt {
            Ok(accepted) => accepted,
            Err(err) => {
                debug!(%connection_id, match_id, row, col, error = %err, "Move rejected");
                self.send_error(connection_id, err.to_string(), session_error_code(&err));
                return;
            }
        };
        self.metrics.increment_moves_processed();
        debug!(
            match_id,
            attacker = %report.attacker.username,
            row,
            col,
            result = %report.outcome,
            sequence = report.sequence,
            "Move accepted"
        );

        let stored = NewMove {
            match_id,
            player: report.attacker.username.clone(),
            x: col,
            y: row,
            result: report.outcome,
            turn_order: report.sequence,
        };
        if let Err(err) = self.database.record_move(stored).await {
            error!(match_id, sequence = report.sequence, error = %err, "Failed to record move");
            self.metrics.increment_persistence_failures();
        }

        self.broadcast_to_users(
            &players,
            ServerMessage::MoveResult {
                match_id,
                attacker: report.attacker.username.clone(),
                row,
                col,
                result: report.outcome,
                next_turn: report.next_turn.user_id(),
            },
        );

        if let Some(resolution) = report.resolution {
            self.sessions.remove(match_id);
            self.finish_match(resolution).await;
        }
    }

    pub(super) async fn handle_resign(
        &self,
        connection_id: &ConnectionId,
        match_id: MatchId,
        user_id: UserId,
    ) {
        let Some(identity) = self.connection_manager.identity(connection_id) else {
            self.send_error(connection_id, "Not logged in.", ErrorCode::NotLoggedIn);
            return;
        };
        if identity.user_id != user_id {
            let err = SessionError::NotParticipant;
            self.send_error(connection_id, err.to_string(), session_error_code(&err));
            return;
        }

        let conceded = self
            .sessions
            .with_session(match_id, |session| {
                session.concede(user_id, EndReason::Resignation)
            })
            .unwrap_or(Err(SessionError::MatchNotFound));

        match conceded {
            Ok(resolution) => {
                info!(%connection_id, match_id, user_id, "Player resigned");
                self.sessions.remove(match_id);
                self.finish_match(resolution).await;
            }
            Err(err) => {
                debug!(%connection_id, match_id, error = %err, "Resignation rejected");
                self.send_error(connection_id, err.to_string(), session_error_code(&err));
            }
        }
    }

    /// End the user's live match, if any, with them as the loser.
    pub(super) async fn forfeit_active_match(&self, user_id: UserId, reason: EndReason) -> bool {
        let Some(match_id) = self.sessions.match_for_user(user_id) else {
            return false;
        };
        let conceded = self
            .sessions
            .with_session(match_id, |session| session.concede(user_id, reason));

        match conceded {
            Some(Ok(resolution)) => {
                info!(match_id, user_id, ?reason, "Match forfeited");
                self.sessions.remove(match_id);
                self.finish_match(resolution).await;
                true
            }
            // Already resolved by a concurrent move or resignation.
            Some(Err(_)) | None => false,
        }
    }

    /// Rate, persist and announce a resolved match. Called once per session.
    async fn finish_match(&self, resolution: Resolution) {
        let Resolution {
            match_id,
            winner,
            loser,
            outcome,
            reason,
        } = resolution;
        let (winner_elo, loser_elo) = rate_match(
            winner.rating,
            loser.rating,
            GameScore::Win,
            self.config.k_factor,
        );

        let updates = [
            RatingUpdate {
                user_id: winner.user_id,
                new_elo: winner_elo,
                result: PlayerResult::Win,
            },
            RatingUpdate {
                user_id: loser.user_id,
                new_elo: loser_elo,
                result: PlayerResult::Lose,
            },
        ];
        if let Err(err) = self
            .database
            .finish_match(match_id, outcome, &updates)
            .await
        {
            error!(match_id, error = %err, "Failed to persist match result");
            self.metrics.increment_persistence_failures();
        }
        self.metrics.increment_matches_completed();
        info!(
            match_id,
            winner = %winner.username,
            loser = %loser.username,
            winner_elo,
            loser_elo,
            ?reason,
            "Match finished"
        );

        for update in updates {
            let Some(connection_id) = self
                .connection_manager
                .finish_match_for(update.user_id, update.new_elo)
            else {
                continue;
            };
            self.connection_manager.send(
                &connection_id,
                Arc::new(ServerMessage::MatchResult {
                    match_id,
                    result: update.result,
                    new_elo: update.new_elo,
                }),
            );
        }
    }
}
