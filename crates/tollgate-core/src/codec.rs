//! # Token Codec
//!
//! Encodes and decodes HS256-signed compact tokens.
//!
//! Signature verification is delegated to `jsonwebtoken`. Expiry is checked
//! here, at whole-second granularity and with no leeway, so that the boundary
//! is exact: a token is valid strictly before `exp` and expired at `exp`.
//! Every `*_at` method takes the clock reading explicitly; the plain variants
//! read `Utc::now()`.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claims::{Claims, DecodedToken, EncodedToken};
use crate::error::TokenError;
use crate::secret::SigningSecret;

/// The only accepted signature algorithm.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Registered claim names that custom claims may not shadow.
pub const RESERVED_CLAIMS: [&str; 4] = ["sub", "iat", "exp", "jti"];

/// Payload as it appears on the wire.
///
/// `jti` is a fresh v4 UUID per token, so two tokens for the same subject
/// and claims issued within one second still differ.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
    #[serde(flatten)]
    extra: Claims,
}

/// Symmetric token codec bound to one process-wide secret and lifetime.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &TOKEN_ALGORITHM)
            .field("lifetime", &self.lifetime)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

impl TokenCodec {
    /// Build a codec. Lifetimes under one second are rejected because
    /// token timestamps carry whole seconds only.
    pub fn new(secret: &SigningSecret, lifetime: Duration) -> Result<Self, TokenError> {
        if lifetime.as_secs() == 0 {
            return Err(TokenError::Configuration(
                "token lifetime must be at least one second".into(),
            ));
        }
        if i64::try_from(lifetime.as_secs()).is_err() {
            return Err(TokenError::Configuration(
                "token lifetime is out of range".into(),
            ));
        }

        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
        })
    }

    /// Configured token lifetime.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Encode a token for `subject` issued now.
    pub fn encode(&self, subject: &str, claims: &Claims) -> Result<String, TokenError> {
        self.encode_at(subject, claims, Utc::now())
    }

    /// Encode a token for `subject` issued at `now`.
    pub fn encode_at(
        &self,
        subject: &str,
        claims: &Claims,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.mint_at(subject, claims, now).map(|minted| minted.token)
    }

    /// Encode a token for `subject` issued now, keeping its metadata.
    pub fn mint(&self, subject: &str, claims: &Claims) -> Result<EncodedToken, TokenError> {
        self.mint_at(subject, claims, Utc::now())
    }

    /// Encode a token for `subject` issued at `now`, keeping its metadata.
    ///
    /// `expires_at = now + lifetime`, both truncated to whole seconds.
    pub fn mint_at(
        &self,
        subject: &str,
        claims: &Claims,
        now: DateTime<Utc>,
    ) -> Result<EncodedToken, TokenError> {
        if subject.is_empty() {
            return Err(TokenError::EmptySubject);
        }
        if let Some(name) = claims.keys().find(|k| RESERVED_CLAIMS.contains(&k.as_str())) {
            return Err(TokenError::ReservedClaim { name: name.clone() });
        }

        let iat = now.timestamp();
        // Range checked in `new`.
        let lifetime_secs = self.lifetime.as_secs() as i64;
        let exp = iat.checked_add(lifetime_secs).ok_or_else(|| TokenError::Encode {
            reason: "expiry overflows".into(),
        })?;

        let payload = WireClaims {
            sub: subject.to_string(),
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
            extra: claims.clone(),
        };

        let token = jsonwebtoken::encode(&Header::new(TOKEN_ALGORITHM), &payload, &self.encoding_key)
            .map_err(|e| TokenError::Encode {
                reason: e.to_string(),
            })?;

        Ok(EncodedToken {
            token,
            token_id: payload.jti,
            issued_at: timestamp(iat, "iat").map_err(encode_range)?,
            expires_at: timestamp(exp, "exp").map_err(encode_range)?,
        })
    }

    /// Decode and validate `token` against the current time.
    pub fn decode(&self, token: &str) -> Result<DecodedToken, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Decode and validate `token` as of `now`.
    ///
    /// Signature and structure are checked first; only an authentic token
    /// can produce [`TokenError::Expired`].
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<DecodedToken, TokenError> {
        let decoded = self.decode_ignoring_expiry(token)?;
        if decoded.is_expired_at(now) {
            return Err(TokenError::Expired {
                expired_at: decoded.expires_at,
            });
        }
        Ok(decoded)
    }

    /// Verify signature and structure but accept expired tokens.
    ///
    /// Used by revocation, where an already-expired token must still map
    /// back to its subject.
    pub fn decode_ignoring_expiry(&self, token: &str) -> Result<DecodedToken, TokenError> {
        let data = jsonwebtoken::decode::<WireClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::decode(e.to_string()))?;
        let wire = data.claims;

        if wire.sub.is_empty() {
            return Err(TokenError::decode("token subject is empty"));
        }
        if wire.jti.is_empty() {
            return Err(TokenError::decode("token id is empty"));
        }

        Ok(DecodedToken {
            subject: wire.sub,
            token_id: wire.jti,
            claims: wire.extra,
            issued_at: timestamp(wire.iat, "iat")?,
            expires_at: timestamp(wire.exp, "exp")?,
        })
    }

    /// Whether `token` has expired. Malformed or forged tokens are an error,
    /// never `false`.
    pub fn is_expired(&self, token: &str) -> Result<bool, TokenError> {
        self.is_expired_at(token, Utc::now())
    }

    /// [`is_expired`](Self::is_expired) as of `now`.
    pub fn is_expired_at(&self, token: &str, now: DateTime<Utc>) -> Result<bool, TokenError> {
        Ok(self.decode_ignoring_expiry(token)?.is_expired_at(now))
    }

    /// Read a custom claim from a valid token. An absent claim is `Ok(None)`.
    pub fn get_claim(&self, token: &str, name: &str) -> Result<Option<String>, TokenError> {
        let decoded = self.decode(token)?;
        Ok(decoded.claim(name).map(str::to_string))
    }
}

fn encode_range(e: TokenError) -> TokenError {
    TokenError::Encode {
        reason: e.to_string(),
    }
}

fn timestamp(secs: i64, field: &str) -> Result<DateTime<Utc>, TokenError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| TokenError::decode(format!("'{field}' is out of range")))
}
