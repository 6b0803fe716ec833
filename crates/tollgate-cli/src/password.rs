//! # Password Subcommand
//!
//! Produces bcrypt hashes in the format the user store expects, and checks
//! a candidate password against a stored hash. The password is taken from
//! `--password` or, when omitted, from the first line of standard input so
//! it stays out of shell history.

use std::io;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::read_secret_line;

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// Password subcommand arguments.
#[derive(Args, Debug)]
pub struct PasswordArgs {
    #[command(subcommand)]
    pub command: PasswordCommand,
}

/// Available password operations.
#[derive(Subcommand, Debug)]
pub enum PasswordCommand {
    /// Hash a password with bcrypt.
    Hash {
        /// Password to hash. Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,

        /// bcrypt work factor (4..=31).
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },

    /// Verify a password against a bcrypt hash. Exit 0 on match, 2 on mismatch.
    Verify {
        /// Stored bcrypt hash.
        #[arg(long)]
        hash: String,

        /// Candidate password. Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
}

/// Execute the password subcommand.
pub fn run_password(args: &PasswordArgs) -> Result<u8> {
    match &args.command {
        PasswordCommand::Hash { password, cost } => {
            let password = resolve_password(password.as_deref())?;
            println!("{}", hash_password(&password, *cost)?);
            Ok(0)
        }
        PasswordCommand::Verify { hash, password } => {
            let password = resolve_password(password.as_deref())?;
            if verify_password(&password, hash)? {
                println!("match");
                Ok(0)
            } else {
                println!("mismatch");
                Ok(2)
            }
        }
    }
}

/// Hash `password` at the given bcrypt `cost`.
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    if !(MIN_COST..=MAX_COST).contains(&cost) {
        bail!("bcrypt cost must be between {MIN_COST} and {MAX_COST}, got {cost}");
    }
    bcrypt::hash(password, cost).context("bcrypt hashing failed")
}

/// Check `password` against `hash`. A malformed hash is an error, not a
/// mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("stored hash is not a valid bcrypt hash")
}

fn resolve_password(given: Option<&str>) -> Result<String> {
    match given {
        Some(p) if !p.is_empty() => Ok(p.to_string()),
        Some(_) => bail!("--password must not be empty"),
        None => read_secret_line(io::stdin().lock()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse", 4).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn hash_rejects_out_of_range_cost() {
        assert!(hash_password("pw", 3).is_err());
        assert!(hash_password("pw", 32).is_err());
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        assert!(verify_password("pw", "not-a-hash").is_err());
    }

    #[test]
    fn run_password_verify_exit_codes() {
        let hash = hash_password("correct horse", 4).unwrap();
        let matching = PasswordArgs {
            command: PasswordCommand::Verify {
                hash: hash.clone(),
                password: Some("correct horse".to_string()),
            },
        };
        assert_eq!(run_password(&matching).unwrap(), 0);

        let wrong = PasswordArgs {
            command: PasswordCommand::Verify {
                hash,
                password: Some("battery staple".to_string()),
            },
        };
        assert_eq!(run_password(&wrong).unwrap(), 2);
    }

    #[test]
    fn empty_password_flag_rejected() {
        assert!(resolve_password(Some("")).is_err());
        assert_eq!(resolve_password(Some("pw")).unwrap(), "pw");
    }
}
