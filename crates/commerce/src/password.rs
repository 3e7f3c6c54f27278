//! Password hashing shared by the storefront, the back-office and the CLI.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length, to bound hashing cost.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Password hashing and checking errors.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Password does not meet the length rules.
    #[error("{0}")]
    Weak(String),

    /// Password does not match the stored hash (or the hash is unreadable).
    #[error("password mismatch")]
    Mismatch,

    /// Argon2 failed to hash.
    #[error("password hashing failed")]
    Hash,
}

/// Check a new password against the length rules.
///
/// # Errors
///
/// Returns `PasswordError::Weak` with a message suitable for the client.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::Weak(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::Weak(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `PasswordError::Hash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::Hash)
}

/// Verify a password against a stored PHC hash.
///
/// # Errors
///
/// Returns `PasswordError::Mismatch` for a wrong password or a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::Mismatch)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("correct horse battery").expect("hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse battery", &hash),
            Err(PasswordError::Mismatch)
        ));
    }

    #[test]
    fn test_malformed_hash_is_a_mismatch() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(PasswordError::Mismatch)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }
}
