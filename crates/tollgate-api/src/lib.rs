//! # tollgate-api — Axum Service for Tollgate
//!
//! Token-based authentication for HTTP requests. Tokens are signed and
//! self-contained, but each one is honoured only while the session store
//! still holds it as its subject's canonical token, so logout and re-login
//! revoke tokens before their embedded expiry.
//!
//! ## API Surface
//!
//! | Route | Module | Gate |
//! |-------|--------|------|
//! | `POST /login` | [`routes::auth`] | exempt |
//! | `POST /logout` | [`routes::auth`] | exempt |
//! | `POST /register` | [`routes::auth`] | exempt |
//! | `GET /me` | [`routes::account`] | identity required |
//! | `POST /admin/data` | [`routes::account`] | `ADMIN` authority |
//! | `GET /openapi.json` | [`openapi`] | exempt |
//! | `GET /health/*` | here | outside the gate |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthGate → Handler
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod password;
pub mod routes;
pub mod state;
pub mod users;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the authentication gate
/// so they remain reachable without credentials.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::auth::router())
        .merge(routes::account::router())
        .merge(openapi::router())
        .layer(from_fn_with_state(state.gate.clone(), auth::auth_middleware))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new()
        .merge(health)
        .merge(api)
        .layer(TraceLayer::new_for_http())
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the session store answers a ping, 503 otherwise.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.sessions().ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "session store unavailable")
        }
    }
}
