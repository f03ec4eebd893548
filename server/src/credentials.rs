//! Credential verification
//!
//! New secrets are always hashed with Argon2. Rows imported from the old
//! database carry unsalted SHA-256 hex digests; those verify through
//! [`LegacySha256Credentials`] and are rehashed on the next successful login.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Checks a submitted secret against its stored form
pub trait CredentialVerifier: Send + Sync {
    fn scheme(&self) -> &'static str;

    fn verify(&self, secret: &str, stored: &str) -> bool;

    /// Stored form should be replaced with an Argon2 hash after a match
    fn needs_upgrade(&self) -> bool {
        false
    }
}

pub struct Argon2Credentials;

impl CredentialVerifier for Argon2Credentials {
    fn scheme(&self) -> &'static str {
        "argon2"
    }

    fn verify(&self, secret: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Unparseable argon2 hash: {}", e);
                false
            }
        }
    }
}

pub struct LegacySha256Credentials;

impl CredentialVerifier for LegacySha256Credentials {
    fn scheme(&self) -> &'static str {
        "sha256"
    }

    fn verify(&self, secret: &str, stored: &str) -> bool {
        let digest = format!("{:x}", Sha256::digest(secret.as_bytes()));
        digest.eq_ignore_ascii_case(stored)
    }

    fn needs_upgrade(&self) -> bool {
        true
    }
}

/// Pick the verifier for a stored credential. Unknown formats (including
/// plaintext) have no verifier and never match.
pub fn verifier_for(stored: &str) -> Option<&'static dyn CredentialVerifier> {
    if stored.starts_with("$argon2") {
        Some(&Argon2Credentials as &dyn CredentialVerifier)
    } else if stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(&LegacySha256Credentials as &dyn CredentialVerifier)
    } else {
        None
    }
}

/// Verify `secret` against `stored`. Returns `Some(needs_upgrade)` on a match.
pub fn check(secret: &str, stored: &str) -> Option<bool> {
    let verifier = verifier_for(stored)?;
    if verifier.verify(secret, stored) {
        Some(verifier.needs_upgrade())
    } else {
        None
    }
}

/// Argon2 hash with a fresh salt
pub fn hash_secret(secret: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Security answers compare case-insensitively
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Shared password rules for registration and reset
pub fn check_new_password(password: &str, confirm: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long!",
            MIN_PASSWORD_LEN
        )));
    }
    if password != confirm {
        return Err(AppError::Validation("Passwords do not match!".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_round_trip() {
        let hash = hash_secret("secret123").unwrap();
        assert_eq!(verifier_for(&hash).unwrap().scheme(), "argon2");
        assert_eq!(check("secret123", &hash), Some(false));
        assert_eq!(check("wrong", &hash), None);
    }

    #[test]
    fn test_legacy_digest_matches_and_requests_upgrade() {
        let stored = format!("{:x}", Sha256::digest(b"secret123"));
        assert_eq!(verifier_for(&stored).unwrap().scheme(), "sha256");
        assert_eq!(check("secret123", &stored), Some(true));
        assert_eq!(check("secret124", &stored), None);
    }

    #[test]
    fn test_plaintext_never_matches() {
        assert!(verifier_for("admin123").is_none());
        assert_eq!(check("admin123", "admin123"), None);
    }

    #[test]
    fn test_answers_normalized() {
        assert_eq!(normalize_answer("  Toyota "), "toyota");
        let stored = hash_secret(&normalize_answer("Toyota")).unwrap();
        assert!(check(&normalize_answer("TOYOTA"), &stored).is_some());
    }

    #[test]
    fn test_new_password_rules() {
        assert!(check_new_password("abc", "abc").is_err());
        assert!(check_new_password("abcdef", "abcdeg").is_err());
        assert!(check_new_password("abcdef", "abcdef").is_ok());
    }
}
