//! One-way hashing for PINs and passwords
//!
//! Secrets are hashed with Argon2id using a fresh random salt and stored as a
//! PHC-format string (`$argon2id$v=19$m=...`). Plaintext is never persisted or
//! compared directly.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::result::{Error, Result};

/// Hash a secret with Argon2id. Returns a PHC-format string.
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| Error::credential(format!("failed to hash secret: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a secret against a PHC-format hash.
///
/// Returns `Ok(false)` on mismatch and `Err` when the stored hash is malformed.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| Error::credential(format!("invalid stored hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_not_plaintext() {
        let hash = hash_secret("1234").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("1234$"));
    }

    #[test]
    fn test_verify_matches_only_original() {
        let hash = hash_secret("correct horse").unwrap();
        assert!(verify_secret("correct horse", &hash).unwrap());
        assert!(!verify_secret("correct horse ", &hash).unwrap());
        assert!(!verify_secret("wrong", &hash).unwrap());
    }

    #[test]
    fn test_same_secret_hashes_differently() {
        let a = hash_secret("4821").unwrap();
        let b = hash_secret("4821").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let err = verify_secret("1234", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, Error::Credential(_)));
    }
}
