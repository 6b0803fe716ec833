//! # Request Extraction & Credential Validation
//!
//! JSON body extraction that maps serde rejections into the error envelope,
//! plus the field rules shared by the login and registration DTOs.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Longest accepted username, in characters.
pub const MAX_USERNAME_CHARS: usize = 64;
/// Shortest accepted password for new accounts, in bytes.
pub const MIN_PASSWORD_BYTES: usize = 8;
/// bcrypt ignores input past 72 bytes, so longer passwords are refused.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Request bodies with rules beyond what serde checks.
pub trait Validate {
    /// Returns a human-readable reason on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body; malformed JSON becomes [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// [`extract_json`] followed by [`Validate::validate`], failing with
/// [`AppError::Validation`] (422).
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Usernames double as token subjects and session key suffixes, so they
/// may not contain whitespace or `:`.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("username must not be empty".into());
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(format!(
            "username must be at most {MAX_USERNAME_CHARS} characters"
        ));
    }
    if username.chars().any(|c| c.is_whitespace() || c == ':') {
        return Err("username must not contain whitespace or ':'".into());
    }
    Ok(())
}

/// Password policy for new accounts.
pub fn validate_new_password(password: &str) -> Result<(), String> {
    let len = password.len();
    if len < MIN_PASSWORD_BYTES {
        return Err(format!(
            "password must be at least {MIN_PASSWORD_BYTES} bytes"
        ));
    }
    if len > MAX_PASSWORD_BYTES {
        return Err(format!("password must be at most {MAX_PASSWORD_BYTES} bytes"));
    }
    Ok(())
}
