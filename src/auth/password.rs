//! Password hashing with Argon2id.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::error::AppError;

/// Hashes and verifies passwords as PHC strings (`$argon2id$...`).
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Argon2id with the crate defaults (19 MiB, 2 passes, 1 lane).
    pub fn new() -> Self {
        Self { params: Params::default() }
    }

    /// Custom cost parameters; tests use a small memory cost to stay fast.
    pub fn with_params(
        memory_cost: u32,
        time_cost: u32,
        parallelism: u32,
    ) -> Result<Self, argon2::Error> {
        let params = Params::new(memory_cost, time_cost, parallelism, None)?;
        Ok(Self { params })
    }

    /// Hashes on the blocking pool so request workers are not stalled.
    pub async fn hash(&self, password: String) -> Result<String, AppError> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(|e| AppError::internal(format!("password hash task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
    }

    /// Returns `Ok(false)` on mismatch; errors only if the stored hash is unreadable.
    pub async fn verify(&self, password: String, stored_hash: String) -> Result<bool, AppError> {
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored_hash)
                .map_err(|e| AppError::internal(format!("stored password hash unreadable: {e}")))?;
            // Parameters are read back from the PHC string.
            Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|e| AppError::internal(format!("password verify task failed: {e}")))?
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::with_params(4096, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("password123".to_string()).await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("password123".to_string(), hash.clone()).await.unwrap());
        assert!(!hasher.verify("password124".to_string(), hash.clone()).await.unwrap());
        assert!(!hasher.verify(String::new(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let hasher = fast_hasher();
        let a = hasher.hash("same".to_string()).await.unwrap();
        let b = hasher.hash("same".to_string()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_garbage_hash_is_an_error() {
        let hasher = fast_hasher();
        assert!(hasher.verify("x".to_string(), "not-a-hash".to_string()).await.is_err());
    }
}
