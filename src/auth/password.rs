//! Credential Hasher
//! Mission: One-way password hashing with bcrypt and constant-time verification

use thiserror::Error;

/// Work factor for production hashes (~1s per hash on commodity hardware).
pub const BCRYPT_COST: u32 = 14;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashingError(String);

impl From<tokio::task::JoinError> for HashingError {
    fn from(e: tokio::task::JoinError) -> Self {
        HashingError(format!("hashing task failed: {e}"))
    }
}

/// bcrypt wrapper; salt is generated per call and embedded in the output.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self { cost: BCRYPT_COST }
    }
}

impl CredentialHasher {
    /// Hasher with a custom cost. Tests use `bcrypt::MIN_COST`.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password. Strength policy is the caller's concern.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashingError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| HashingError(e.to_string()))
    }

    /// Verify a plaintext password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`, as is an empty hash. A hash that bcrypt cannot
    /// parse is an error: it means the stored record is corrupt.
    pub fn verify(&self, plaintext: &str, hash_blob: &str) -> Result<bool, HashingError> {
        if hash_blob.is_empty() {
            return Ok(false);
        }
        bcrypt::verify(plaintext, hash_blob).map_err(|e| HashingError(e.to_string()))
    }
}
