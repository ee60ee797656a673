//! Configuration module for the battleship server.
//!
//! Configuration comes from JSON documents (inline env var, explicit path, working
//! directory, executable directory), then per-field environment overrides, on top of
//! compiled defaults.
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Session, lobby and outbound-queue capacities
//! - [`matchmaking`]: Sweep interval, ELO gap, queue bound, K-factor
//! - [`protocol`]: Credential limits and room code length
//! - [`security`]: CORS, message size and connection limits
//! - [`logging`]: Logging configuration
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod matchmaking;
pub mod protocol;
pub mod security;
pub mod server;
pub mod types;
pub mod validation;

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use matchmaking::MatchmakingConfig;

pub use protocol::ProtocolConfig;

pub use security::SecurityConfig;

pub use server::ServerConfig;

pub use types::Config;

pub use validation::validate_config;
