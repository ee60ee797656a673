//! Per-match state machine: fleet placement, turn alternation and resolution.

use serde::Serialize;
use thiserror::Error;

use super::board::{Board, BoardError, ShotOutcome};
use super::MatchOutcome;
use crate::protocol::{MatchId, UserId};

/// A match participant as captured when the session was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub user_id: UserId,
    pub username: String,
    /// Rating before this match; used for the post-match update.
    pub rating: i32,
}

/// Which side of a match a participant occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    pub const fn opponent(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// Waiting for one or both fleets.
    Created,
    /// Both fleets placed; not yet announced.
    Ready,
    InProgress,
    Finished,
}

/// Whose move it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Player(UserId),
    GameOver,
}

impl Turn {
    pub const fn user_id(self) -> Option<UserId> {
        match self {
            Self::Player(user_id) => Some(user_id),
            Self::GameOver => None,
        }
    }
}

/// How a match reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    FleetDestroyed,
    Resignation,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Match not found.")]
    MatchNotFound,
    #[error("You are not part of this match.")]
    NotParticipant,
    #[error("Match has not started.")]
    NotStarted,
    #[error("Not your turn.")]
    NotYourTurn,
    #[error("Invalid move.")]
    InvalidMove(#[source] BoardError),
    #[error("Match is already finished.")]
    AlreadyFinished,
    #[error("Ships already placed.")]
    FleetAlreadyPlaced,
    #[error("Ships can no longer be placed.")]
    PlacementClosed,
}

/// Outcome of an accepted attack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub attacker: Participant,
    pub outcome: ShotOutcome,
    /// 1-based position of this move within the match.
    pub sequence: u32,
    pub next_turn: Turn,
    /// Set when this move destroyed the last enemy ship.
    pub resolution: Option<Resolution>,
}

/// Terminal result of a match, ready to be rated and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub match_id: MatchId,
    pub winner: Participant,
    pub loser: Participant,
    pub outcome: MatchOutcome,
    pub reason: EndReason,
}

/// Authoritative state of one match.
#[derive(Debug, Clone)]
pub struct MatchSession {
    match_id: MatchId,
    players: [Participant; 2],
    boards: [Board; 2],
    ready: [bool; 2],
    current_turn: Turn,
    phase: SessionPhase,
    moves_made: u32,
}

impl MatchSession {
    /// `first_turn` must name one of the two participants.
    pub fn new(
        match_id: MatchId,
        first: Participant,
        second: Participant,
        first_turn: UserId,
    ) -> Self {
        debug_assert!(first_turn == first.user_id || first_turn == second.user_id);
        Self {
            match_id,
            players: [first, second],
            boards: [Board::new(), Board::new()],
            ready: [false, false],
            current_turn: Turn::Player(first_turn),
            phase: SessionPhase::Created,
            moves_made: 0,
        }
    }

    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_turn(&self) -> Turn {
        self.current_turn
    }

    pub fn moves_made(&self) -> u32 {
        self.moves_made
    }

    pub fn participant(&self, seat: Seat) -> &Participant {
        &self.players[seat.index()]
    }

    pub fn participants(&self) -> &[Participant; 2] {
        &self.players
    }

    /// Board holding `seat`'s own fleet.
    pub fn board(&self, seat: Seat) -> &Board {
        &self.boards[seat.index()]
    }

    pub fn is_ready(&self, seat: Seat) -> bool {
        self.ready[seat.index()]
    }

    pub fn seat_of(&self, user_id: UserId) -> Option<Seat> {
        if self.players[0].user_id == user_id {
            Some(Seat::First)
        } else if self.players[1].user_id == user_id {
            Some(Seat::Second)
        } else {
            None
        }
    }

    /// Accept a complete fleet for `user_id`. Returns true once both sides are ready.
    pub fn submit_fleet(&mut self, user_id: UserId, board: Board) -> Result<bool, SessionError> {
        let seat = self.seat_of(user_id).ok_or(SessionError::NotParticipant)?;
        match self.phase {
            SessionPhase::Created => {}
            SessionPhase::Finished => return Err(SessionError::AlreadyFinished),
            SessionPhase::Ready | SessionPhase::InProgress => {
                return Err(SessionError::PlacementClosed)
            }
        }
        if self.ready[seat.index()] {
            return Err(SessionError::FleetAlreadyPlaced);
        }

        self.boards[seat.index()] = board;
        self.ready[seat.index()] = true;

        if self.ready.iter().all(|ready| *ready) {
            self.phase = SessionPhase::Ready;
            return Ok(true);
        }
        Ok(false)
    }

    /// Move a ready session into play. Returns the player to move first.
    pub fn start(&mut self) -> Option<UserId> {
        if self.phase != SessionPhase::Ready {
            return None;
        }
        self.phase = SessionPhase::InProgress;
        self.current_turn.user_id()
    }

    /// Resolve an attack by `user_id` against the opponent's board.
    ///
    /// Rejected attacks leave the session untouched and keep the turn.
    pub fn attack(&mut self, user_id: UserId, row: i32, col: i32) -> Result<MoveReport, SessionError> {
        let seat = self.seat_of(user_id).ok_or(SessionError::NotParticipant)?;
        match self.phase {
            SessionPhase::InProgress => {}
            SessionPhase::Finished => return Err(SessionError::AlreadyFinished),
            SessionPhase::Created | SessionPhase::Ready => return Err(SessionError::NotStarted),
        }
        if self.current_turn != Turn::Player(user_id) {
            return Err(SessionError::NotYourTurn);
        }

        let defender = seat.opponent();
        let outcome = self.boards[defender.index()]
            .attack(row, col)
            .map_err(SessionError::InvalidMove)?;
        self.moves_made += 1;

        let resolution = if self.boards[defender.index()].all_sunk() {
            Some(self.finish(seat, EndReason::FleetDestroyed))
        } else {
            self.current_turn = Turn::Player(self.participant(defender).user_id);
            None
        };

        Ok(MoveReport {
            attacker: self.participant(seat).clone(),
            outcome,
            sequence: self.moves_made,
            next_turn: self.current_turn,
            resolution,
        })
    }

    /// End the match with `user_id` losing, by resignation or disconnect.
    pub fn concede(&mut self, user_id: UserId, reason: EndReason) -> Result<Resolution, SessionError> {
        let seat = self.seat_of(user_id).ok_or(SessionError::NotParticipant)?;
        if self.phase == SessionPhase::Finished {
            return Err(SessionError::AlreadyFinished);
        }
        Ok(self.finish(seat.opponent(), reason))
    }

    fn finish(&mut self, winner: Seat, reason: EndReason) -> Resolution {
        self.phase = SessionPhase::Finished;
        self.current_turn = Turn::GameOver;
        Resolution {
            match_id: self.match_id,
            winner: self.participant(winner).clone(),
            loser: self.participant(winner.opponent()).clone(),
            outcome: match winner {
                Seat::First => MatchOutcome::P1Win,
                Seat::Second => MatchOutcome::P2Win,
            },
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Orientation, ShipType};
    use crate::game::fleet::{FleetPlacement, ShipPlacement};

    fn participant(user_id: UserId, name: &str, rating: i32) -> Participant {
        Participant {
            user_id,
            username: name.to_string(),
            rating,
        }
    }

    fn new_session(first_turn: UserId) -> MatchSession {
        MatchSession::new(
            7,
            participant(1, "alice", 1000),
            participant(2, "bob", 1150),
            first_turn,
        )
    }

    /// Ships stacked on rows 0..5, each anchored at column 0.
    fn stacked_board() -> Board {
        let mut fleet = FleetPlacement::default();
        for (row, ship_type) in ShipType::ALL.iter().enumerate() {
            fleet.set(
                *ship_type,
                ShipPlacement(row as i32, 0, Orientation::Horizontal),
            );
        }
        fleet.build_board().unwrap()
    }

    fn started_session(first_turn: UserId) -> MatchSession {
        let mut session = new_session(first_turn);
        assert!(!session.submit_fleet(1, stacked_board()).unwrap());
        assert!(session.submit_fleet(2, stacked_board()).unwrap());
        assert_eq!(session.start(), Some(first_turn));
        session
    }

    #[test]
    fn placement_fills_the_submitters_own_slot() {
        let mut session = new_session(1);
        session.submit_fleet(2, stacked_board()).unwrap();

        assert!(session.is_ready(Seat::Second));
        assert!(!session.is_ready(Seat::First));
        assert_eq!(session.board(Seat::First).ships().len(), 0);
        assert_eq!(session.phase(), SessionPhase::Created);
    }

    #[test]
    fn placement_rules() {
        let mut session = new_session(1);
        assert_eq!(
            session.submit_fleet(99, stacked_board()),
            Err(SessionError::NotParticipant)
        );
        session.submit_fleet(1, stacked_board()).unwrap();
        assert_eq!(
            session.submit_fleet(1, stacked_board()),
            Err(SessionError::FleetAlreadyPlaced)
        );
        session.submit_fleet(2, stacked_board()).unwrap();
        assert_eq!(session.phase(), SessionPhase::Ready);
        session.start();
        assert_eq!(
            session.submit_fleet(2, stacked_board()),
            Err(SessionError::PlacementClosed)
        );
    }

    #[test]
    fn attacks_before_start_are_rejected() {
        let mut session = new_session(1);
        assert_eq!(session.attack(1, 0, 0), Err(SessionError::NotStarted));
        assert_eq!(session.start(), None);
    }

    #[test]
    fn turns_alternate_on_every_accepted_shot() {
        let mut session = started_session(1);

        assert_eq!(session.attack(2, 0, 0), Err(SessionError::NotYourTurn));
        let report = session.attack(1, 0, 0).unwrap();
        assert_eq!(report.outcome, ShotOutcome::Hit);
        assert_eq!(report.sequence, 1);
        assert_eq!(report.next_turn, Turn::Player(2));

        // A hit grants no extra turn.
        assert_eq!(session.attack(1, 0, 1), Err(SessionError::NotYourTurn));
        let report = session.attack(2, 9, 9).unwrap();
        assert_eq!(report.outcome, ShotOutcome::Miss);
        assert_eq!(session.current_turn(), Turn::Player(1));
    }

    #[test]
    fn invalid_shot_keeps_the_turn() {
        let mut session = started_session(1);
        session.attack(1, 9, 9).unwrap();
        session.attack(2, 9, 9).unwrap();

        let err = session.attack(1, 9, 9).unwrap_err();
        assert!(matches!(err, SessionError::InvalidMove(_)));
        assert_eq!(session.current_turn(), Turn::Player(1));
        assert_eq!(session.moves_made(), 2);
        assert!(matches!(
            session.attack(1, 10, 0),
            Err(SessionError::InvalidMove(BoardError::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn sinking_the_last_ship_finishes_the_match() {
        let mut session = started_session(1);
        let targets: Vec<(usize, usize)> = session
            .board(Seat::Second)
            .ships()
            .iter()
            .flat_map(|ship| ship.cells().collect::<Vec<_>>())
            .collect();

        let mut last = None;
        for (i, (row, col)) in targets.iter().enumerate() {
            let report = session.attack(1, *row as i32, *col as i32).unwrap();
            if i + 1 < targets.len() {
                assert!(report.resolution.is_none());
                // Bob wastes a shot on a distinct empty cell each turn.
                session.attack(2, 5 + i as i32 / 10, i as i32 % 10).unwrap();
            } else {
                last = Some(report);
            }
        }

        let report = last.unwrap();
        assert_eq!(report.outcome, ShotOutcome::Sunk);
        assert_eq!(report.next_turn, Turn::GameOver);
        let resolution = report.resolution.unwrap();
        assert_eq!(resolution.winner.user_id, 1);
        assert_eq!(resolution.loser.user_id, 2);
        assert_eq!(resolution.outcome, MatchOutcome::P1Win);
        assert_eq!(resolution.reason, EndReason::FleetDestroyed);
        assert_eq!(session.phase(), SessionPhase::Finished);
        assert_eq!(session.attack(2, 0, 0), Err(SessionError::AlreadyFinished));
    }

    #[test]
    fn concede_awards_the_opponent_once() {
        let mut session = new_session(2);
        let resolution = session.concede(1, EndReason::Resignation).unwrap();
        assert_eq!(resolution.winner.username, "bob");
        assert_eq!(resolution.outcome, MatchOutcome::P2Win);
        assert_eq!(resolution.winner.rating, 1150);
        assert_eq!(
            session.concede(2, EndReason::Disconnect),
            Err(SessionError::AlreadyFinished)
        );
        assert_eq!(
            session.concede(3, EndReason::Disconnect),
            Err(SessionError::NotParticipant)
        );
    }
}
