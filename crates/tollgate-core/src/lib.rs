#![deny(missing_docs)]

//! # tollgate-core — Token Codec
//!
//! Stateless half of Tollgate's authentication model. A token is a compact
//! JWS (HMAC-SHA256) whose payload carries:
//!
//! - `sub`: the subject (username) the token was issued for,
//! - `iat` / `exp`: issue and expiry times as Unix seconds,
//! - `jti`: a random token id, so every issued token is distinct,
//! - any number of additional string claims (e.g. `role`).
//!
//! ## Validity
//!
//! A token is valid only when its signature verifies against the process
//! secret **and** the current time is strictly before `exp`. The two failure
//! classes are kept apart:
//!
//! - [`TokenError::Decode`]: malformed structure or bad signature,
//! - [`TokenError::Expired`]: authentic token whose `exp` has passed.
//!
//! Neither is "revoked". Revocation is decided by the session store in
//! `tollgate-session`; this crate never performs I/O.
//!
//! ## Crate Policy
//!
//! - Leaf of the dependency DAG: no internal crate dependencies.
//! - The signing secret never appears in `Debug` output or encoded tokens.

pub mod claims;
pub mod codec;
pub mod error;
pub mod secret;

pub use claims::{Claims, DecodedToken, EncodedToken, ROLE_CLAIM};
pub use codec::{TokenCodec, RESERVED_CLAIMS, TOKEN_ALGORITHM};
pub use error::TokenError;
pub use secret::SigningSecret;
