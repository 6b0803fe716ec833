//! # Claims & Decoded Tokens

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Custom claims embedded in a token. Order-irrelevant string → string map.
pub type Claims = BTreeMap<String, String>;

/// Name of the claim carrying the subject's role.
pub const ROLE_CLAIM: &str = "role";

/// A token whose signature has been verified.
///
/// Produced by [`TokenCodec`](crate::TokenCodec). Whether expiry was enforced
/// depends on which decode method produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedToken {
    /// Subject the token was issued for.
    pub subject: String,
    /// Unique per-token identifier (`jti`).
    pub token_id: String,
    /// Custom claims (registered claims excluded).
    pub claims: Claims,
    /// Issue time, truncated to whole seconds.
    pub issued_at: DateTime<Utc>,
    /// Expiry time, truncated to whole seconds.
    pub expires_at: DateTime<Utc>,
}

/// A freshly signed token together with what was embedded in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedToken {
    /// The compact token string handed to the client.
    pub token: String,
    /// Unique per-token identifier (`jti`).
    pub token_id: String,
    /// Issue time, truncated to whole seconds.
    pub issued_at: DateTime<Utc>,
    /// Expiry time, truncated to whole seconds.
    pub expires_at: DateTime<Utc>,
}

impl DecodedToken {
    /// Look up a custom claim. Absent claims yield `None`, never an error.
    pub fn claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).map(String::as_str)
    }

    /// The `role` claim, if present.
    pub fn role(&self) -> Option<&str> {
        self.claim(ROLE_CLAIM)
    }

    /// Whether the token is expired at `now` (`now >= expires_at`).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
