//! Argon2id implementation of `CredentialHasher`.
//! Hashes are self-describing PHC strings, so parameters can change later
//! without invalidating stored credentials.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use domains::{AppError, CredentialHasher, Result};
use tracing::warn;

#[derive(Default)]
pub struct Argon2Hasher {
    argon: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom memory (KiB) and iteration cost, e.g. cheap hashing in test suites.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AppError::Validation(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Storage(format!("password hashing failed: {e}")))
    }

    /// Verifies `secret` against a stored Argon2 hash.
    fn verify(&self, secret: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "stored credential is not a PHC string");
                return false;
            }
        };
        self.argon
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
