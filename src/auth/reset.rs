//! Password-reset secrets.
//!
//! The secret goes out by email exactly once; only its digest is stored.
//! The digest is deliberately unsalted so a presented secret can be hashed
//! again and looked up by equality.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

pub const RESET_TOKEN_TTL: Duration = Duration::minutes(10);

#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Hex-encoded random value handed to the user. Never persisted.
    pub secret: String,
    /// sha256 hex digest of the secret; the only part the store sees.
    pub digest: String,
    pub expires_at: OffsetDateTime,
}

pub fn digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn generate_at(now: OffsetDateTime) -> ResetToken {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let secret = hex::encode(bytes);
    ResetToken {
        digest: digest(&secret),
        secret,
        expires_at: now + RESET_TOKEN_TTL,
    }
}

pub fn generate() -> ResetToken {
    generate_at(OffsetDateTime::now_utc())
}
