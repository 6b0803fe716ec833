//! # Session Store Errors

use thiserror::Error;

/// Failure talking to the backing session store.
///
/// There is deliberately no "not found" variant: a missing session is
/// `Ok(None)` from [`SessionStore::get`](crate::SessionStore::get).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The store rejected the command or the connection failed.
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer within the configured bound.
    #[error("session store timed out after {timeout_ms}ms")]
    Timeout {
        /// The bound that was exceeded.
        timeout_ms: u64,
    },
}
