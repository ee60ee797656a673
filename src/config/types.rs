//! Root configuration types.

use super::defaults::default_port;
use super::logging::LoggingConfig;
use super::matchmaking::MatchmakingConfig;
use super::protocol::ProtocolConfig;
use super::security::SecurityConfig;
use super::server::ServerConfig;
use serde::{Deserialize, Serialize};

/// Root configuration struct for the battleship server.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub matchmaking: MatchmakingConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            server: ServerConfig::default(),
            matchmaking: MatchmakingConfig::default(),
            protocol: ProtocolConfig::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}
