use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable codes attached to `ERROR` messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Protocol errors
    InvalidInput,
    UnknownMessageType,
    MessageTooLarge,
    UnsupportedFrame,

    // Authorization errors
    NotLoggedIn,
    NotInMatch,
    NotYourTurn,

    // Match errors
    MatchNotFound,
    MatchNotStarted,
    MatchFinished,
    InvalidMove,

    // Resource exhaustion
    TooManyConnections,

    // Server errors
    InternalError,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => {
                "The message could not be parsed. Send a JSON object with a `type` field and the fields that type requires."
            }
            Self::UnknownMessageType => {
                "The message `type` is not recognized by this server."
            }
            Self::MessageTooLarge => {
                "The message size exceeds the maximum allowed limit. Please send a smaller message."
            }
            Self::UnsupportedFrame => {
                "Only text frames carrying JSON are accepted on this connection."
            }
            Self::NotLoggedIn => "This operation requires a logged-in user. Send LOGIN_REQ first.",
            Self::NotInMatch => "You are not a participant of the named match.",
            Self::NotYourTurn => "It is the opponent's turn. Wait for their MOVE_RESULT.",
            Self::MatchNotFound => {
                "No live match has this id. It may have finished or never existed."
            }
            Self::MatchNotStarted => {
                "Both players must place their fleets before attacks are accepted."
            }
            Self::MatchFinished => "The match has already been resolved.",
            Self::InvalidMove => {
                "The target cell is outside the board or has already been attacked."
            }
            Self::TooManyConnections => {
                "The server or your address has reached its connection limit. Try again later."
            }
            Self::InternalError => {
                "An internal server error occurred. Please try again later."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
