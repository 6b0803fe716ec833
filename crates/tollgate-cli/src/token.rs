//! # Token Subcommand
//!
//! Mints, decodes and checks bearer tokens with the service's signing
//! secret. Tokens minted here are accepted by the gate only once a session
//! store entry points at them, so `mint` is mainly useful for testing the
//! codec and for scripted fixtures.
//!
//! ## Exit Codes
//!
//! | Command | 0 | 1 | 2 |
//! |---------|---|---|---|
//! | `mint` | token printed | bad input | n/a |
//! | `decode` | claims printed | not a valid token | n/a |
//! | `check` | valid | not a valid token | signature ok, expired |

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use tollgate_core::{Claims, SigningSecret, TokenCodec, TokenError};

/// Token subcommand arguments.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Shared HMAC signing secret. Must match the service's secret.
    #[arg(long, env = "TOLLGATE_JWT_SECRET", hide_env_values = true)]
    pub secret: String,

    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Available token operations.
#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Mint a signed token for a subject.
    Mint {
        /// Subject (username) the token is issued for.
        #[arg(long)]
        subject: String,

        /// Custom claim as `name=value`. Repeatable.
        #[arg(long = "claim", value_parser = parse_claim)]
        claims: Vec<(String, String)>,

        /// Token lifetime in seconds.
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u64,
    },

    /// Verify the signature and print the token's contents, expired or not.
    Decode {
        /// The encoded token.
        token: String,
    },

    /// Verify the signature and expiry. Exit code reports the verdict.
    Check {
        /// The encoded token.
        token: String,
    },
}

/// Parse a `name=value` claim argument.
pub fn parse_claim(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("claim name is empty in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Execute the token subcommand.
pub fn run_token(args: &TokenArgs) -> Result<u8> {
    let secret = SigningSecret::new(args.secret.as_str()).context("invalid signing secret")?;
    if secret.is_weak() {
        tracing::warn!("signing secret is shorter than 32 bytes");
    }

    match &args.command {
        TokenCommand::Mint {
            subject,
            claims,
            ttl_secs,
        } => {
            let token = mint(&secret, subject, claims, *ttl_secs)?;
            println!("{token}");
            Ok(0)
        }
        TokenCommand::Decode { token } => run_decode(&secret, token),
        TokenCommand::Check { token } => run_check(&secret, token),
    }
}

/// Mint a token for `subject` carrying `claims`, valid for `ttl_secs`.
pub fn mint(
    secret: &SigningSecret,
    subject: &str,
    claims: &[(String, String)],
    ttl_secs: u64,
) -> Result<String> {
    let codec = TokenCodec::new(secret, Duration::from_secs(ttl_secs))?;
    let claims: Claims = claims.iter().cloned().collect();
    let token = codec.encode(subject, &claims)?;
    tracing::info!(subject, ttl_secs, "token minted");
    Ok(token)
}

fn run_decode(secret: &SigningSecret, token: &str) -> Result<u8> {
    let codec = verifier(secret)?;
    match codec.decode_ignoring_expiry(token) {
        Ok(decoded) => {
            let expired = decoded.is_expired_at(chrono::Utc::now());
            let out = json!({
                "subject": decoded.subject,
                "token_id": decoded.token_id,
                "claims": decoded.claims,
                "issued_at": decoded.issued_at,
                "expires_at": decoded.expires_at,
                "expired": expired,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(0)
        }
        Err(e) => {
            eprintln!("invalid token: {e}");
            Ok(1)
        }
    }
}

fn run_check(secret: &SigningSecret, token: &str) -> Result<u8> {
    let codec = verifier(secret)?;
    let code = check_code(&codec, token);
    match code {
        0 => println!("valid"),
        2 => println!("expired"),
        _ => println!("invalid"),
    }
    Ok(code)
}

/// Map a token to the `check` exit code: 0 valid, 2 expired, 1 otherwise.
pub fn check_code(codec: &TokenCodec, token: &str) -> u8 {
    match codec.decode(token) {
        Ok(_) => 0,
        Err(TokenError::Expired { expired_at }) => {
            tracing::info!(%expired_at, "token expired");
            2
        }
        Err(e) => {
            tracing::info!(reason = %e, "token rejected");
            1
        }
    }
}

// Lifetime is irrelevant when only decoding.
fn verifier(secret: &SigningSecret) -> Result<TokenCodec> {
    Ok(TokenCodec::new(secret, Duration::from_secs(1))?)
}
