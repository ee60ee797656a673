//! Matchmaking queue configuration.

use super::defaults::{
    default_k_factor, default_matchmaking_interval_ms, default_max_elo_gap, default_max_queue_size,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MatchmakingConfig {
    /// Pause between pairing sweeps (milliseconds)
    #[serde(default = "default_matchmaking_interval_ms")]
    pub interval_ms: u64,
    /// Largest rating difference two queued players may have and still be paired
    #[serde(default = "default_max_elo_gap")]
    pub max_elo_gap: i32,
    /// Maximum number of waiting players
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// ELO K-factor applied when a match resolves
    #[serde(default = "default_k_factor")]
    pub k_factor: f64,
}

impl MatchmakingConfig {
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_matchmaking_interval_ms(),
            max_elo_gap: default_max_elo_gap(),
            max_queue_size: default_max_queue_size(),
            k_factor: default_k_factor(),
        }
    }
}
