//! Password Hashing
//!
//! Argon2id with a configurable time cost. Each hash carries its own salt and
//! parameters, so verification works against hashes produced under older
//! settings.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

use super::error::{AuthError, AuthResult};

/// Memory cost in KiB (OWASP minimum for Argon2id).
const MEMORY_COST_KIB: u32 = 19456;

fn hasher(time_cost: u32) -> AuthResult<Argon2<'static>> {
    let params =
        Params::new(MEMORY_COST_KIB, time_cost.max(1), 1, None).map_err(|_| AuthError::PasswordHash)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password. Salt varies per call, so output is never deterministic.
pub fn hash_password(plain: &str, time_cost: u32) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher(time_cost)?
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
///
/// Returns `false` (never an error) for malformed hashes; parameters are read
/// from the hash string itself.
#[must_use]
pub fn verify_password(plain: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trip() {
        let hash = hash_password("Demo1234", 2).unwrap();
        assert!(verify_password("Demo1234", &hash));
        assert!(!verify_password("Demo1235", &hash));
    }

    #[test]
    fn hashing_is_salted() {
        let a = hash_password("Demo1234", 2).unwrap();
        let b = hash_password("Demo1234", 2).unwrap();
        assert_ne!(a, b);
        assert!(verify_password("Demo1234", &a));
        assert!(verify_password("Demo1234", &b));
    }

    #[test]
    fn malformed_hash_returns_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }
}
