//! Server capacity configuration types.

use super::defaults::{default_max_matches, default_max_rooms, default_message_queue_capacity};
use serde::{Deserialize, Serialize};

/// Server configuration for sessions, lobbies and outbound queues.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Maximum number of live match sessions
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
    /// Maximum number of open custom rooms
    #[serde(default = "default_max_rooms")]
    pub max_rooms: usize,
    /// Capacity of each connection's outbound message channel
    #[serde(default = "default_message_queue_capacity")]
    pub message_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_matches: default_max_matches(),
            max_rooms: default_max_rooms(),
            message_queue_capacity: default_message_queue_capacity(),
        }
    }
}
