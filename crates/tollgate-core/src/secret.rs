//! # Signing Secret
//!
//! Process-wide HMAC key. Loaded once at startup and never rotated at
//! runtime. The bytes are zeroized on drop and redacted from `Debug`.

use zeroize::Zeroizing;

use crate::error::TokenError;

/// Secrets shorter than this still work but are flagged by [`SigningSecret::is_weak`].
pub const RECOMMENDED_MIN_SECRET_LEN: usize = 32;

/// Shared HMAC secret used to sign and verify tokens.
#[derive(Clone)]
pub struct SigningSecret(Zeroizing<Vec<u8>>);

impl SigningSecret {
    /// Wrap a secret string. Rejects empty or whitespace-only secrets.
    pub fn new(secret: impl Into<String>) -> Result<Self, TokenError> {
        let secret: String = secret.into();
        if secret.trim().is_empty() {
            return Err(TokenError::Configuration(
                "signing secret must not be empty".into(),
            ));
        }
        Ok(Self(Zeroizing::new(secret.into_bytes())))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the secret is shorter than [`RECOMMENDED_MIN_SECRET_LEN`] bytes.
    pub fn is_weak(&self) -> bool {
        self.0.len() < RECOMMENDED_MIN_SECRET_LEN
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SigningSecret").field(&"[REDACTED]").finish()
    }
}
