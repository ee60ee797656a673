use crate::config::ProtocolConfig;

pub fn validate_username_with_config(name: &str, config: &ProtocolConfig) -> Result<(), String> {
    if name.is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    let length = name.chars().count();
    if length < config.min_username_length {
        return Err(format!(
            "Username too short (min {} characters)",
            config.min_username_length
        ));
    }
    if length > config.max_username_length {
        return Err(format!(
            "Username too long (max {} characters)",
            config.max_username_length
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(
            "Username may only contain letters, digits, '-' and '_'".to_string(),
        );
    }
    Ok(())
}

pub fn validate_password_with_config(password: &str, config: &ProtocolConfig) -> Result<(), String> {
    let length = password.chars().count();
    if length < config.min_password_length {
        return Err(format!(
            "Password too short (min {} characters)",
            config.min_password_length
        ));
    }
    if length > config.max_password_length {
        return Err(format!(
            "Password too long (max {} characters)",
            config.max_password_length
        ));
    }
    Ok(())
}

/// Canonical form used for room lookups: trimmed and upper-cased.
pub fn normalize_room_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

pub fn validate_room_code_with_config(code: &str, config: &ProtocolConfig) -> Result<(), String> {
    if code.is_empty() {
        return Err("Room code cannot be empty".to_string());
    }
    if code.len() != config.room_code_length {
        return Err(format!(
            "Room code must be exactly {} characters",
            config.room_code_length
        ));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Room code must be alphanumeric".to_string());
    }
    Ok(())
}
