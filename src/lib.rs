#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Broadside Server
//!
//! An authoritative WebSocket server for rated, turn-based naval combat.
//!
//! Players register and log in, then either enter the rated matchmaking queue or meet
//! through a custom room code. The server owns both boards, resolves every attack and
//! settles ratings when a match ends. Storage is in-memory.

/// Server configuration and environment variables
pub mod config;

/// Persistence layer (in-memory implementation)
pub mod database;

/// Boards, fleets, match sessions and rating math
pub mod game;

/// Structured logging configuration
pub mod logging;

/// Metrics collection and reporting
pub mod metrics;

/// WebSocket message protocol definitions
pub mod protocol;

/// Password hashing
pub mod security;

/// Main server orchestration
pub mod server;

/// WebSocket connection handling
pub mod websocket;
