//! Credential hashing for stored resource owner passwords.
//!
//! Passwords are hashed with Argon2id using a random salt from `OsRng` and
//! kept in PHC string format. Backends that still hold legacy plain-text
//! passwords are handled by [`verify_stored_password`].

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

use crate::AuthResult;
use crate::error::AuthError;

/// Length in bytes of generated opaque tokens.
pub const OPAQUE_TOKEN_BYTES: usize = 20;

/// Generates a random opaque token, hex encoded.
#[must_use]
pub fn generate_opaque_token() -> String {
    let bytes: [u8; OPAQUE_TOKEN_BYTES] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verifies a password against a PHC-formatted Argon2 hash.
///
/// Returns `Err` only if the value is not a PHC string at all. A PHC string
/// whose fields are not a usable Argon2 hash never matches.
pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthError::storage(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Verifies a password against whatever a backend stored.
///
/// Values in PHC format are checked with Argon2, anything else is compared
/// as plain text.
pub fn verify_stored_password(password: &str, stored: &str) -> AuthResult<bool> {
    if stored.starts_with("$argon2") {
        verify_password(password, stored)
    } else {
        Ok(password == stored)
    }
}
