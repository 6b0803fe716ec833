//! # Session Store Contract
//!
//! | Method | Semantics |
//! |--------|-----------|
//! | [`put`](SessionStore::put) | Unconditional overwrite with TTL; no history kept |
//! | [`get`](SessionStore::get) | Side-effect free read; expired records are absent |
//! | [`delete`](SessionStore::delete) | Idempotent; a missing key is not an error |
//! | [`ping`](SessionStore::ping) | Readiness check |
//!
//! Implementations must be safe to share across request tasks. Per-key
//! atomicity comes from the backend.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SessionError;

/// Key-value store mapping a subject to its canonical token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Establish or replace the session for `subject`.
    async fn put(&self, subject: &str, token: &str, ttl: Duration) -> Result<(), SessionError>;

    /// Current token for `subject`, or `None` if absent or expired.
    async fn get(&self, subject: &str) -> Result<Option<String>, SessionError>;

    /// Remove the session for `subject`, whether or not it exists.
    async fn delete(&self, subject: &str) -> Result<(), SessionError>;

    /// Verify the store is reachable.
    async fn ping(&self) -> Result<(), SessionError> {
        Ok(())
    }

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}
