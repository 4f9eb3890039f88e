use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

use crate::error::PasswordError;

/// Hashes with argon2id and a fresh random salt; the PHC string embeds salt and parameters.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on mismatch; `Err` only when the digest itself is unusable.
/// The digest comparison inside argon2 is constant-time.
pub fn verify_password(plain: &str, digest: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(digest).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        PasswordError::Malformed(e.to_string())
    })?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => {
            error!(error = %e, "argon2 verify_password error");
            Err(PasswordError::Malformed(e.to_string()))
        }
    }
}

lazy_static! {
    static ref DUMMY_DIGEST: Option<String> = hash_password("catalog-dummy-password").ok();
}

/// Runs a full argon2 verification against a throwaway digest so a lookup miss
/// costs the same as a wrong password. Always `false`.
pub fn verify_dummy(plain: &str) -> bool {
    if let Some(digest) = DUMMY_DIGEST.as_deref() {
        let _ = verify_password(plain, digest);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let first = hash_password("pw123").unwrap();
        let second = hash_password("pw123").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("pw123", &first).unwrap());
        assert!(verify_password("pw123", &second).unwrap());
    }

    #[test]
    fn digest_is_not_plaintext() {
        let hash = hash_password("pw123").unwrap();
        assert!(!hash.contains("pw123"));
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
        assert!(!verify_password("", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, PasswordError::Malformed(_)));
    }

    #[test]
    fn dummy_verification_runs_argon2_and_never_matches() {
        assert!(DUMMY_DIGEST.as_deref().is_some_and(|d| d.starts_with("$argon2")));
        assert!(!verify_dummy("catalog-dummy-password"));
        assert!(!verify_dummy("pw123"));
    }
}
