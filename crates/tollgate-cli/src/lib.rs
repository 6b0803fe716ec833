//! # tollgate-cli — Operator CLI for Tollgate
//!
//! Provides the `tollgate` command-line interface for working with tokens
//! and credentials outside the running service.
//!
//! ## Subcommands
//!
//! - `tollgate token`: Mint, decode and check bearer tokens.
//! - `tollgate password`: Produce and verify bcrypt password hashes.
//!
//! ```bash
//! export TOLLGATE_JWT_SECRET=...
//! tollgate token mint --subject alice --claim role=ADMIN --ttl-secs 600
//! tollgate token check "$TOKEN"; echo $?
//! tollgate password hash --cost 12 < password.txt
//! ```

pub mod password;
pub mod token;

use std::io::BufRead;

use anyhow::{bail, Context, Result};

/// Read a secret value from the first line of `reader`, without its line
/// terminator. Used when a password is not given on the command line.
pub fn read_secret_line(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("failed to read from standard input")?;
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        bail!("no input provided on standard input");
    }
    Ok(trimmed.to_string())
}
