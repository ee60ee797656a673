use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hash a password into the 64-character lowercase hex form stored with each account.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

/// Constant-time comparison of `password`'s hash against a stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let candidate = hash_password(password);
    if candidate.len() != stored_hash.len() {
        return false;
    }
    candidate.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_password("hunter2").len(), 64);
    }

    #[test]
    fn verify_matches_only_the_same_password() {
        let stored = hash_password("secret");
        assert!(verify_password("secret", &stored));
        assert!(!verify_password("Secret", &stored));
        assert!(!verify_password("secret", "short"));
    }
}
