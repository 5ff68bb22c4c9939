//! Password hashing
//!
//! Argon2id with the crate's default parameters and a fresh random salt per
//! hash. Hashes are stored as PHC strings.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Shortest password accepted when creating an account
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password, returning the PHC string.
///
/// ```ignore
/// let hash = aine::services::password::hash_password("ward-round-7")?;
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored hash.
///
/// A mismatch is `Ok(false)`; a malformed hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
        .context("Failed to parse password hash")?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e))
            .context("Password verification error"),
    }
}

/// Check a new password against the length rule
pub fn is_acceptable_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_and_salted() {
        let hash1 = hash_password("same_password").expect("Failed to hash password");
        let hash2 = hash_password("same_password").expect("Failed to hash password");

        assert!(hash1.starts_with("$argon2id$"));
        assert_ne!(hash1, hash2);
        assert!(!hash1.contains("same_password"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").unwrap();
        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_unicode_password() {
        let password = "नर्सिंग-संस्थान🔐";
        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash).unwrap());
    }

    #[test]
    fn test_password_length_rule() {
        assert!(!is_acceptable_password("short"));
        assert!(is_acceptable_password("longenough"));
        // Counted in characters, not bytes
        assert!(!is_acceptable_password("पासवर्ड"));
    }
}
