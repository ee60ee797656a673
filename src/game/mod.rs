//! Game rules: boards, fleets, ratings and the per-match state machine.
//!
//! Nothing in this module performs I/O or touches shared server state.

pub mod board;
pub mod fleet;
pub mod rating;
pub mod session;

pub use board::{
    Board, BoardError, Cell, Orientation, PlacementError, Ship, ShipType, ShotOutcome, BOARD_SIZE,
    FLEET_SIZE,
};
pub use fleet::{FleetPlacement, ShipPlacement};
pub use rating::{expected_score, rate_match, updated_rating, GameScore, DEFAULT_RATING};
pub use session::{
    EndReason, MatchSession, MoveReport, Participant, Resolution, Seat, SessionError,
    SessionPhase, Turn,
};

use serde::{Deserialize, Serialize};

/// Stored result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchOutcome {
    InProgress,
    #[serde(rename = "P1_WIN")]
    P1Win,
    #[serde(rename = "P2_WIN")]
    P2Win,
    Draw,
}

impl MatchOutcome {
    pub const fn is_final(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}
