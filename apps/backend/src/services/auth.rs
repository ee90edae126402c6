//! Password hashing and opaque session tokens.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Duration;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{ApiError, Result};

pub fn access_token_ttl() -> Duration {
    Duration::hours(1)
}

pub fn refresh_token_ttl() -> Duration {
    Duration::days(30)
}

pub const MIN_PASSWORD_CHARS: usize = 8;

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))
}

/// Check a password against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Fresh random bearer token.
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Tokens are stored only as their SHA-256 hex digest.
pub fn hash_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Trimmed, lowercased email.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
