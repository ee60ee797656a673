//! Configuration validation functions.

use super::Config;

/// Shortest and longest room codes the lobby generator will produce.
pub const ROOM_CODE_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 4..=12;

/// Reject configurations the server cannot run with.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.port == 0 {
        anyhow::bail!("port must be non-zero");
    }

    let server = &config.server;
    if server.max_matches == 0 {
        anyhow::bail!("server.max_matches must be greater than zero");
    }
    if server.max_rooms == 0 {
        anyhow::bail!("server.max_rooms must be greater than zero");
    }
    if server.message_queue_capacity == 0 {
        anyhow::bail!("server.message_queue_capacity must be greater than zero");
    }

    let matchmaking = &config.matchmaking;
    if matchmaking.interval_ms == 0 {
        anyhow::bail!("matchmaking.interval_ms must be greater than zero");
    }
    if matchmaking.max_elo_gap < 0 {
        anyhow::bail!(
            "matchmaking.max_elo_gap must not be negative (got {})",
            matchmaking.max_elo_gap
        );
    }
    if matchmaking.max_queue_size == 0 {
        anyhow::bail!("matchmaking.max_queue_size must be greater than zero");
    }
    if !(matchmaking.k_factor.is_finite() && matchmaking.k_factor > 0.0) {
        anyhow::bail!(
            "matchmaking.k_factor must be a positive number (got {})",
            matchmaking.k_factor
        );
    }

    let protocol = &config.protocol;
    if protocol.min_username_length == 0 {
        anyhow::bail!("protocol.min_username_length must be greater than zero");
    }
    if protocol.min_username_length > protocol.max_username_length {
        anyhow::bail!(
            "protocol.min_username_length ({}) exceeds protocol.max_username_length ({})",
            protocol.min_username_length,
            protocol.max_username_length
        );
    }
    if protocol.min_password_length == 0 {
        anyhow::bail!("protocol.min_password_length must be greater than zero");
    }
    if protocol.min_password_length > protocol.max_password_length {
        anyhow::bail!(
            "protocol.min_password_length ({}) exceeds protocol.max_password_length ({})",
            protocol.min_password_length,
            protocol.max_password_length
        );
    }
    if !ROOM_CODE_LENGTH_RANGE.contains(&protocol.room_code_length) {
        anyhow::bail!(
            "protocol.room_code_length must be between {} and {} (got {})",
            ROOM_CODE_LENGTH_RANGE.start(),
            ROOM_CODE_LENGTH_RANGE.end(),
            protocol.room_code_length
        );
    }

    let security = &config.security;
    if security.max_connections == 0 {
        anyhow::bail!("security.max_connections must be greater than zero");
    }
    if security.max_connections_per_ip == 0 {
        anyhow::bail!("security.max_connections_per_ip must be greater than zero");
    }
    if security.max_message_size < 64 {
        anyhow::bail!(
            "security.max_message_size must be at least 64 bytes (got {})",
            security.max_message_size
        );
    }
    if security.cors_origins.trim().is_empty() {
        anyhow::bail!("security.cors_origins must not be empty; use \"*\" to allow any origin");
    }

    Ok(())
}
