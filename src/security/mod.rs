/// Credential handling
///
/// Passwords are stored as unsalted SHA-256 hex digests and compared in constant time.
pub mod password;

pub use password::{hash_password, verify_password};
