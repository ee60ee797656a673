use crate::config::ProtocolConfig;
use rand::RngExt;

/// Alphabet without the easily confused characters 0, O, 1 and I.
pub const CLEAN_CHARS: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Generate room code avoiding confusing characters (0, O, I, 1) with configurable length
pub fn generate_clean_room_code_with_config(config: &ProtocolConfig) -> String {
    generate_clean_room_code_of_length(config.room_code_length)
}

/// Generate a clean room code of the requested length.
pub fn generate_clean_room_code_of_length(length: usize) -> String {
    if length == 0 {
        return String::new();
    }
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CLEAN_CHARS.len());
            // SAFETY: `idx` is produced by `random_range(0..len)`, so it is
            // always within [0, len).
            #[allow(clippy::indexing_slicing)]
            let ch = CLEAN_CHARS[idx] as char;
            ch
        })
        .collect()
}
