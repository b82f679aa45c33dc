//! One-way password hashing for stored credentials.
//!
//! Hashes are argon2 PHC strings; the plaintext never leaves this module.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hash a plaintext password with a fresh random salt.
///
/// # Errors
/// Returns an error if argon2 rejects the input.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError::Hash(err.to_string()))
}

/// Check a plaintext password against a stored PHC hash.
///
/// Malformed hashes never verify.
#[must_use]
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    })
}

/// [`verify_password`] on the blocking pool. A failed join never verifies.
pub async fn verify_password_blocking(plaintext: String, hash: String) -> bool {
    match tokio::task::spawn_blocking(move || verify_password(&plaintext, &hash)).await {
        Ok(valid) => valid,
        Err(err) => {
            error!("password verification task failed: {err}");
            false
        }
    }
}
