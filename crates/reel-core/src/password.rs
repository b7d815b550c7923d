//! # Password Hashing
//!
//! argon2id hashing and verification for user passwords. Hashes are stored
//! in PHC string format; the plaintext never leaves the registration or
//! login handler.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::validator::Validator;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash `plaintext` with argon2id and a fresh random salt.
pub fn hash(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify `plaintext` against a stored PHC hash. A mismatch is `Ok(false)`;
/// only a malformed stored hash is an error.
pub fn verify(plaintext: &str, stored: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored).map_err(|e| PasswordError::Hash(e.to_string()))?;
    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Hash(e.to_string())),
    }
}

pub fn validate_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "password", "must be provided");
    v.check(
        plaintext.len() >= 8,
        "password",
        "must be at least 8 characters long",
    );
    v.check(
        plaintext.len() <= 72,
        "password",
        "must not be more than 72 characters long",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let stored = hash("correct horse battery").expect("hash");
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify("correct horse battery", &stored).expect("verify"));
    }

    #[test]
    fn wrong_password_is_ok_false() {
        let stored = hash("correct horse battery").expect("hash");
        assert!(!verify("wrong guess", &stored).expect("verify"));
    }

    #[test]
    fn malformed_stored_hash_is_error() {
        assert!(verify("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn validate_rejects_short_and_empty() {
        let mut v = Validator::new();
        validate_plaintext(&mut v, "");
        assert!(!v.is_valid());

        let mut v = Validator::new();
        validate_plaintext(&mut v, "short");
        assert!(!v.is_valid());
    }

    #[test]
    fn validate_accepts_reasonable_password() {
        let mut v = Validator::new();
        validate_plaintext(&mut v, "a perfectly fine password");
        assert!(v.is_valid());
    }
}
