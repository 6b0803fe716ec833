//! # Password Hashing
//!
//! bcrypt is CPU-bound, so hashing and verification run on the
//! blocking pool rather than on a request task.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("password hashing task failed: {0}")]
    Task(String),
}

/// Password hashing collaborator.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hash `plaintext` with a fresh salt.
    async fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    /// Whether `plaintext` matches `hash`. A stored hash that cannot be
    /// parsed never matches.
    async fn matches(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordError>;

    /// A well-formed hash no password matches, costing the same to verify as
    /// a real one. Login checks it when the account is unknown or disabled.
    fn decoy_hash(&self) -> &str;
}

/// Salt and digest of a throwaway bcrypt hash; the cost is spliced in.
const DECOY_SALT_AND_DIGEST: &str = "N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
    decoy: String,
}

impl BcryptHasher {
    /// Hasher at `cost`, with a decoy hash of the same cost.
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            decoy: format!("$2b${cost:02}${DECOY_SALT_AND_DIGEST}"),
        }
    }

    /// Configured work factor.
    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let plaintext = plaintext.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))?
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    async fn matches(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordError> {
        let plaintext = plaintext.to_owned();
        let hash = hash.to_owned();
        let result = tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))?;

        match result {
            Ok(matched) => Ok(matched),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is unreadable");
                Ok(false)
            }
        }
    }

    fn decoy_hash(&self) -> &str {
        &self.decoy
    }
}
