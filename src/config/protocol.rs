//! Protocol configuration: credential limits and room code shape.

use super::defaults::{
    default_max_password_length, default_max_username_length, default_min_password_length,
    default_min_username_length, default_room_code_length,
};
use serde::{Deserialize, Serialize};

/// Protocol configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    /// Minimum username length in characters
    #[serde(default = "default_min_username_length")]
    pub min_username_length: usize,
    /// Maximum username length in characters
    #[serde(default = "default_max_username_length")]
    pub max_username_length: usize,
    /// Minimum password length in characters
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    /// Maximum password length in characters
    #[serde(default = "default_max_password_length")]
    pub max_password_length: usize,
    /// Length of generated custom room codes
    #[serde(default = "default_room_code_length")]
    pub room_code_length: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            min_username_length: default_min_username_length(),
            max_username_length: default_max_username_length(),
            min_password_length: default_min_password_length(),
            max_password_length: default_max_password_length(),
            room_code_length: default_room_code_length(),
        }
    }
}
