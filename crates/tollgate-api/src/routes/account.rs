//! # Protected Endpoints
//!
//! Routes that need an authenticated caller. The gate attaches the
//! identity; these handlers only decide what that identity may see.

use std::collections::BTreeMap;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{require_authority, AuthIdentity};
use crate::error::AppError;
use crate::state::AppState;
use crate::users::ADMIN_ROLE;

/// The caller as seen by the service.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub subject: String,
    pub role: Option<String>,
    pub authorities: Vec<String>,
    pub claims: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminDataResponse {
    pub message: String,
    pub subject: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/admin/data", post(admin_data))
}

/// GET /me: Describe the authenticated caller.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Caller identity", body = MeResponse),
        (status = 401, description = "Anonymous, or session revoked", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "account"
)]
async fn me(identity: AuthIdentity) -> Json<MeResponse> {
    Json(MeResponse {
        role: identity.role().map(str::to_string),
        subject: identity.subject,
        authorities: identity.authorities,
        claims: identity.claims,
    })
}

/// POST /admin/data: Administrators only.
#[utoipa::path(
    post,
    path = "/admin/data",
    responses(
        (status = 200, description = "Admin payload", body = AdminDataResponse),
        (status = 401, description = "Anonymous, or session revoked", body = crate::error::ErrorBody),
        (status = 403, description = "Caller lacks the ADMIN authority", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "account"
)]
async fn admin_data(identity: AuthIdentity) -> Result<Json<AdminDataResponse>, AppError> {
    require_authority(&identity, ADMIN_ROLE)?;
    Ok(Json(AdminDataResponse {
        message: "visible to administrators only".to_string(),
        subject: identity.subject,
    }))
}
