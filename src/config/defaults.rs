//! Default value functions for configuration fields.
//!
//! These back the `#[serde(default = ...)]` attributes throughout the configuration
//! system, grouped by the section they belong to.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    8080
}

// =============================================================================
// Server Defaults
// =============================================================================

pub const fn default_max_matches() -> usize {
    50
}

pub const fn default_max_rooms() -> usize {
    50
}

pub const fn default_message_queue_capacity() -> usize {
    256
}

// =============================================================================
// Matchmaking Defaults
// =============================================================================

pub const fn default_matchmaking_interval_ms() -> u64 {
    1000
}

pub const fn default_max_elo_gap() -> i32 {
    200
}

pub const fn default_max_queue_size() -> usize {
    100
}

pub const fn default_k_factor() -> f64 {
    32.0
}

// =============================================================================
// Protocol Defaults
// =============================================================================

pub const fn default_min_username_length() -> usize {
    3
}

pub const fn default_max_username_length() -> usize {
    32
}

pub const fn default_min_password_length() -> usize {
    4
}

pub const fn default_max_password_length() -> usize {
    128
}

pub const fn default_room_code_length() -> usize {
    5
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}

pub const fn default_max_message_size() -> usize {
    16384 // 16KB
}

pub const fn default_max_connections() -> usize {
    100
}

pub const fn default_max_connections_per_ip() -> usize {
    10
}
