//! # Token Errors
//!
//! Structured failures for token encoding and decoding. Decode and expiry
//! failures are separate variants so callers can treat them differently
//! without string matching.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced by [`TokenCodec`](crate::TokenCodec) and
/// [`SigningSecret`](crate::SigningSecret).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token is structurally malformed or its signature does not verify.
    #[error("token decode failed: {reason}")]
    Decode {
        /// What went wrong. Never contains secret material.
        reason: String,
    },

    /// The token is authentic but its expiry has passed.
    #[error("token expired at {expired_at}")]
    Expired {
        /// The `exp` embedded in the token.
        expired_at: DateTime<Utc>,
    },

    /// A custom claim would shadow one of the registered claims.
    #[error("claim name '{name}' is reserved")]
    ReservedClaim {
        /// The offending claim name.
        name: String,
    },

    /// Tokens must be issued for a non-empty subject.
    #[error("token subject must not be empty")]
    EmptySubject,

    /// Signing the token failed.
    #[error("token encode failed: {reason}")]
    Encode {
        /// Failure description from the signer.
        reason: String,
    },

    /// The codec was constructed with unusable parameters.
    #[error("invalid token configuration: {0}")]
    Configuration(String),
}

impl TokenError {
    /// Shorthand for a [`TokenError::Decode`] with the given reason.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Whether this is a decode (malformed / bad signature) failure.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Whether this is an expiry failure.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}
