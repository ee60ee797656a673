// Protocol module: wire messages, identifiers, error codes and input validation

pub mod error_codes;
pub mod messages;
pub mod parsing;
pub mod room_codes;
pub mod types;
pub mod validation;

pub use error_codes::ErrorCode;

pub use types::{ConnectionId, MatchId, OperationResult, PlayerIdentity, PlayerResult, UserId};

pub use messages::{ClientMessage, ServerMessage};

pub use parsing::{parse_client_message, ProtocolError};
