//! # Session Endpoints
//!
//! Login, logout and registration. All three paths are exempt from the
//! authentication gate by default.
//!
//! - `POST /login` verifies credentials and issues a token that becomes the
//!   account's only live session.
//! - `POST /logout` revokes the session behind the presented token. It
//!   always answers 200, whatever happens internally.
//! - `POST /register` creates an account with role `USER`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tollgate_core::{Claims, ROLE_CLAIM};
use utoipa::ToSchema;

use crate::auth::bearer_token;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, validate_new_password, validate_username, Validate};
use crate::state::AppState;
use crate::users::{UserRecord, DEFAULT_ROLE};

/// Login credentials.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err("username and password must not be empty".to_string());
        }
        Ok(())
    }
}

/// Issued bearer token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        validate_username(&self.username)?;
        validate_new_password(&self.password)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub username: String,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// Build the session router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/register", post(register))
}

/// POST /login: Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Unknown user, disabled account or wrong password", body = crate::error::ErrorBody),
        (status = 422, description = "Empty username or password", body = crate::error::ErrorBody),
        (status = 503, description = "Session store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "session"
)]
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let req = extract_validated_json(body)?;
    tracing::info!(username = %req.username, "login attempt");

    let user = match state.users.find_by_username(&req.username).await? {
        Some(user) if user.enabled => user,
        other => {
            // Unknown and disabled accounts pay the same bcrypt cost as a
            // wrong password.
            state
                .passwords
                .matches(&req.password, state.passwords.decoy_hash())
                .await?;
            let reason = if other.is_some() { "account disabled" } else { "unknown user" };
            tracing::warn!(username = %req.username, reason, "login refused");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !state.passwords.matches(&req.password, &user.password_hash).await? {
        tracing::warn!(username = %req.username, "login refused: password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    let claims = Claims::from([(ROLE_CLAIM.to_string(), user.role.clone())]);
    let issued = state.tokens.issue(&user.username, &claims).await?;

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
    }))
}

/// POST /logout: Revoke the caller's session.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out (also returned when there was nothing to revoke)", body = LogoutResponse),
    ),
    tag = "session"
)]
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<LogoutResponse> {
    match bearer_token(&headers) {
        Ok(token) => match state.tokens.revoke(token).await {
            Ok(subject) => tracing::info!(%subject, "logged out"),
            Err(e) => tracing::warn!(error = %e, "logout could not revoke session"),
        },
        Err(reason) => tracing::warn!(?reason, "logout without a bearer token"),
    }

    Json(LogoutResponse {
        message: "logged out".to_string(),
    })
}

/// POST /register: Create an account.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 409, description = "Username taken", body = crate::error::ErrorBody),
        (status = 422, description = "Username or password rejected", body = crate::error::ErrorBody),
    ),
    tag = "session"
)]
async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let req = extract_validated_json(body)?;

    if state.users.exists_by_username(&req.username).await? {
        return Err(AppError::Conflict(format!(
            "username '{}' is already taken",
            req.username
        )));
    }

    let hash = state.passwords.hash(&req.password).await?;
    // A concurrent registration can still win the race; save reports it.
    state
        .users
        .save(UserRecord::new(&req.username, hash, DEFAULT_ROLE))
        .await?;

    tracing::info!(username = %req.username, "account registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            username: req.username,
            role: DEFAULT_ROLE.to_string(),
        }),
    ))
}
