use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{MatchId, OperationResult, PlayerResult, UserId};
use crate::game::{FleetPlacement, ShotOutcome};

/// Requests sent by clients. Each frame is one object tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    RegisterReq {
        username: String,
        password: String,
    },
    LoginReq {
        username: String,
        password: String,
    },
    Logout,
    QueueEnterReq,
    QueueExitReq,
    CreateRoomReq,
    JoinRoomReq {
        code: String,
    },
    RoomCloseReq {
        code: String,
    },
    /// Submit a full fleet for `match_id`.
    PlaceShip {
        match_id: MatchId,
        user_id: UserId,
        ships: FleetPlacement,
    },
    MoveReq {
        match_id: MatchId,
        row: i32,
        col: i32,
    },
    ResignReq {
        match_id: MatchId,
        user_id: UserId,
    },
    /// Keepalive; answered with `PONG`.
    Ping,
}

impl ClientMessage {
    /// Every accepted value of the `type` field.
    pub const TYPE_NAMES: [&'static str; 12] = [
        "REGISTER_REQ",
        "LOGIN_REQ",
        "LOGOUT",
        "QUEUE_ENTER_REQ",
        "QUEUE_EXIT_REQ",
        "CREATE_ROOM_REQ",
        "JOIN_ROOM_REQ",
        "ROOM_CLOSE_REQ",
        "PLACE_SHIP",
        "MOVE_REQ",
        "RESIGN_REQ",
        "PING",
    ];

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RegisterReq { .. } => "REGISTER_REQ",
            Self::LoginReq { .. } => "LOGIN_REQ",
            Self::Logout => "LOGOUT",
            Self::QueueEnterReq => "QUEUE_ENTER_REQ",
            Self::QueueExitReq => "QUEUE_EXIT_REQ",
            Self::CreateRoomReq => "CREATE_ROOM_REQ",
            Self::JoinRoomReq { .. } => "JOIN_ROOM_REQ",
            Self::RoomCloseReq { .. } => "ROOM_CLOSE_REQ",
            Self::PlaceShip { .. } => "PLACE_SHIP",
            Self::MoveReq { .. } => "MOVE_REQ",
            Self::ResignReq { .. } => "RESIGN_REQ",
            Self::Ping => "PING",
        }
    }
}

/// Replies and pushed notifications sent by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    RegisterRes(OperationResult),
    LoginRes {
        result: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elo: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    LogoutRes(OperationResult),
    QueueEnterRes(OperationResult),
    QueueExitRes(OperationResult),
    CreateRoomRes {
        result: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    JoinRoomRes(OperationResult),
    RoomCloseRes(OperationResult),
    PlaceShipRes(OperationResult),
    /// Pushed to both players when a session is created.
    MatchFound {
        match_id: MatchId,
        player1: String,
        player2: String,
        first_turn: UserId,
    },
    /// Pushed to both players once both fleets are placed.
    MatchStart {
        match_id: MatchId,
        current_turn: UserId,
    },
    /// Pushed to both players after every accepted attack.
    MoveResult {
        match_id: MatchId,
        attacker: String,
        row: i32,
        col: i32,
        result: ShotOutcome,
        /// `null` once the match is over.
        next_turn: Option<UserId>,
    },
    /// Pushed to each player when the match resolves, personalized per recipient.
    MatchResult {
        match_id: MatchId,
        result: PlayerResult,
        new_elo: i32,
    },
    Pong,
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
}

impl ServerMessage {
    pub fn login_success(user_id: UserId, username: String, elo: i32) -> Self {
        Self::LoginRes {
            result: 1,
            user_id: Some(user_id),
            username: Some(username),
            elo: Some(elo),
            message: None,
        }
    }

    pub fn login_failure(message: impl Into<String>) -> Self {
        Self::LoginRes {
            result: 0,
            user_id: None,
            username: None,
            elo: None,
            message: Some(message.into()),
        }
    }

    pub fn room_created(code: String) -> Self {
        Self::CreateRoomRes {
            result: 1,
            code: Some(code),
            message: None,
        }
    }

    pub fn room_creation_failed(message: impl Into<String>) -> Self {
        Self::CreateRoomRes {
            result: 0,
            code: None,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>, error_code: ErrorCode) -> Self {
        Self::Error {
            message: message.into(),
            error_code: Some(error_code),
        }
    }
}
