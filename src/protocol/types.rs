use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one live transport connection.
pub type ConnectionId = Uuid;

/// Durable account identifier.
pub type UserId = i64;

/// Durable match identifier, shared by the live session and its stored record.
pub type MatchId = i64;

/// Authenticated identity attached to a connection after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub user_id: UserId,
    pub username: String,
    pub elo: i32,
}

/// Personalized outcome delivered in `MATCH_RESULT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerResult {
    Win,
    Lose,
    Draw,
}

/// Generic `{result, message}` body shared by most `*_RES` replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub result: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperationResult {
    pub fn success() -> Self {
        Self {
            result: 1,
            message: None,
        }
    }

    pub fn success_with(message: impl Into<String>) -> Self {
        Self {
            result: 1,
            message: Some(message.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: 0,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == 1
    }
}
