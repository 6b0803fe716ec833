//! # Token Service
//!
//! Composes the [`TokenCodec`] with a [`SessionStore`]:
//!
//! - **issue** encodes a token, then records that exact string as the
//!   subject's canonical session. The write happens after the encode, and
//!   the caller receives the same string that was stored.
//! - **revoke** recovers the subject from a token (expired tokens included)
//!   and deletes the subject's session record.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tollgate_core::{Claims, TokenCodec, TokenError};

use crate::error::SessionError;
use crate::store::SessionStore;

/// Errors from issuing or revoking a token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenServiceError {
    /// Encoding failed or the presented token could not be decoded.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The session store could not be reached.
    #[error(transparent)]
    Store(#[from] SessionError),
}

/// A freshly issued token and its embedded expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// The token string, identical to the one recorded in the store.
    pub token: String,
    /// Expiry embedded in the token.
    pub expires_at: DateTime<Utc>,
}

/// Issues and revokes session-bound tokens.
#[derive(Clone)]
pub struct TokenService {
    codec: Arc<TokenCodec>,
    store: Arc<dyn SessionStore>,
    session_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("codec", &self.codec)
            .field("store", &self.store.backend())
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

impl TokenService {
    /// Bind a codec and a store. `session_ttl` bounds each session record.
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn SessionStore>, session_ttl: Duration) -> Self {
        Self {
            codec,
            store,
            session_ttl,
        }
    }

    /// The codec used to mint and read tokens.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// The backing session store.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// TTL applied to every session record.
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Mint a token for `subject` and make it the subject's only live session.
    ///
    /// A store failure after a successful encode surfaces as an error and the
    /// token is discarded; the caller never receives a token that was not
    /// recorded.
    pub async fn issue(&self, subject: &str, claims: &Claims) -> Result<IssuedToken, TokenServiceError> {
        let minted = self.codec.mint(subject, claims)?;
        let (token, expires_at) = (minted.token, minted.expires_at);

        self.store.put(subject, &token, self.session_ttl).await?;

        tracing::info!(
            subject,
            %expires_at,
            backend = self.store.backend(),
            "token issued"
        );
        Ok(IssuedToken { token, expires_at })
    }

    /// Remove the session for the subject `token` was issued to.
    ///
    /// Expired tokens are accepted. Returns the subject on success. A
    /// malformed or forged token yields [`TokenServiceError::Token`] and
    /// touches nothing.
    ///
    /// The record is deleted whether or not it still holds `token`, so
    /// presenting an older token also ends the current session.
    pub async fn revoke(&self, token: &str) -> Result<String, TokenServiceError> {
        let decoded = self.codec.decode_ignoring_expiry(token)?;
        self.store.delete(&decoded.subject).await?;
        tracing::info!(subject = %decoded.subject, "session revoked");
        Ok(decoded.subject)
    }
}
