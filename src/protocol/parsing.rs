//! Decoding of inbound frames into [`ClientMessage`].
//!
//! Parsing happens in two steps so that a frame with an unknown `type` can be told
//! apart from a known type with bad fields.

use serde_json::Value;
use thiserror::Error;

use super::error_codes::ErrorCode;
use super::messages::ClientMessage;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("message must be a JSON object")]
    NotAnObject,
    #[error("message has no string `type` field")]
    MissingType,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("malformed {kind}: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// Text placed in the `ERROR` reply.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidJson(_) | Self::NotAnObject => "Invalid JSON message.".to_string(),
            Self::MissingType => "Missing message type.".to_string(),
            Self::UnknownType(kind) => format!("Unknown message type: {kind}"),
            Self::Malformed { kind, .. } => format!("Malformed {kind} message."),
        }
    }

    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownType(_) => ErrorCode::UnknownMessageType,
            _ => ErrorCode::InvalidInput,
        }
    }
}

/// Parse one text frame.
pub fn parse_client_message(raw: &str) -> Result<ClientMessage, ProtocolError> {
    let value: Value = serde_json::from_str(raw).map_err(ProtocolError::InvalidJson)?;
    let Value::Object(ref object) = value else {
        return Err(ProtocolError::NotAnObject);
    };
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    let Some(kind) = ClientMessage::TYPE_NAMES
        .iter()
        .copied()
        .find(|known| *known == kind)
    else {
        return Err(ProtocolError::UnknownType(kind.to_string()));
    };

    serde_json::from_value(value).map_err(|source| ProtocolError::Malformed { kind, source })
}
