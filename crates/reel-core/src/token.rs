//! # Credential Tokens
//!
//! Opaque bearer credentials: 16 random bytes encoded as unpadded base32
//! (exactly 26 characters) plus a SHA-256 digest of that plaintext. Only the
//! digest is ever handed to a store; the plaintext is returned to the caller
//! once at issuance.
//!
//! Verification is digest lookup plus expiry checking. The digest's
//! pre-image resistance is the protection here, not comparison timing.

use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE32_NOPAD;
use rand_core::{OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::validator::Validator;

/// Length of a well-formed token plaintext (16 bytes → 26 base32 chars).
pub const PLAINTEXT_LEN: usize = 26;

/// What a token is good for. A token issued under one scope never
/// authenticates under another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    /// One-shot account activation credentials.
    Activation,
    /// Login session credentials.
    Authentication,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::Authentication => "authentication",
        }
    }
}

/// Failure issuing a token. The entropy source failing is fatal and is not
/// retried.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("entropy source failure: {0}")]
    Entropy(String),
}

/// A bearer credential. `plaintext` is serialized for the issuance response;
/// everything else stays server-side.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip)]
    pub hash: [u8; 32],
    #[serde(skip)]
    pub user_id: Uuid,
    pub expiry: DateTime<Utc>,
    #[serde(skip)]
    pub scope: TokenScope,
}

impl Token {
    /// Generate a fresh token for `user_id`, valid for `ttl` under `scope`.
    pub fn issue(user_id: Uuid, ttl: Duration, scope: TokenScope) -> Result<Token, TokenError> {
        let mut random_bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut random_bytes)
            .map_err(|e| TokenError::Entropy(e.to_string()))?;

        let plaintext = BASE32_NOPAD.encode(&random_bytes);
        let hash = hash_plaintext(&plaintext);

        Ok(Token {
            plaintext,
            hash,
            user_id,
            expiry: Utc::now() + ttl,
            scope,
        })
    }
}

/// SHA-256 digest of a candidate plaintext, as stored by the token store.
pub fn hash_plaintext(plaintext: &str) -> [u8; 32] {
    Sha256::digest(plaintext.as_bytes()).into()
}

/// Syntactic check on a caller-supplied plaintext. Rejects malformed input
/// before any store lookup happens.
pub fn validate_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(
        plaintext.len() == PLAINTEXT_LEN,
        "token",
        "must be 26 characters long",
    );
}
