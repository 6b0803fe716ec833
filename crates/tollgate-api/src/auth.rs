//! # Authentication Gate
//!
//! Per-request decision point that establishes or withholds an
//! authenticated identity. Each inbound request is evaluated exactly once:
//!
//! ```text
//! OPTIONS?            → Preflight      (200, nothing else checked)
//! exempt path?        → Exempt         (forward, no identity)
//! no Bearer header?   → Anonymous      (forward, no identity)
//! decode fails?       → Anonymous      (forward, no identity; logged)
//! store lookup fails  → Rejected 503   (fail closed)
//! record ≠ token      → Rejected 401   (SESSION_INVALID)
//! otherwise           → Authenticated  (identity attached, forward)
//! ```
//!
//! Only the cross-check against the session store short-circuits. A
//! missing or undecodable token is not an error here; routes that need an
//! identity reject anonymous callers through the [`AuthIdentity`]
//! extractor (401), and [`require_authority`] turns a missing authority
//! into 403.
//!
//! The identity lives in the request's extensions and is dropped with the
//! request. Nothing is shared between requests.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tollgate_core::{Claims, DecodedToken, TokenCodec, TokenError};
use tollgate_session::SessionStore;

use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

// ── Path Policy ─────────────────────────────────────────────────────────────

/// One entry of the exemption allow-list.
///
/// `"/docs/**"` matches `/docs` and everything below it; any other string
/// must match the request path exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches one path exactly.
    Exact(String),
    /// Matches the prefix itself and every path below it.
    Prefix(String),
}

impl PathPattern {
    /// `"/x/**"` becomes a prefix pattern, anything else an exact one.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix("/**") {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(raw.to_string()),
        }
    }

    /// Whether `path` falls under this pattern, on segment boundaries.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => path == p,
            Self::Prefix(prefix) => {
                prefix.is_empty()
                    || path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

/// Paths that bypass authentication entirely.
#[derive(Debug, Clone, Default)]
pub struct GatePolicy {
    exempt: Vec<PathPattern>,
}

impl GatePolicy {
    /// Parse each entry with [`PathPattern::parse`].
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            exempt: patterns
                .into_iter()
                .map(|p| PathPattern::parse(p.as_ref()))
                .collect(),
        }
    }

    /// Whether any exemption pattern matches `path`.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt.iter().any(|p| p.matches(path))
    }
}

// ── AuthIdentity ────────────────────────────────────────────────────────────

/// The authenticated caller, attached to the request by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    /// Token subject (username).
    pub subject: String,
    /// Derived from the `role` claim. Empty when the token carries no role.
    pub authorities: Vec<String>,
    /// Every custom claim from the token.
    pub claims: Claims,
}

impl AuthIdentity {
    /// Whether the caller holds `authority`.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    /// The raw `role` claim, for display.
    pub fn role(&self) -> Option<&str> {
        self.claims.get(tollgate_core::ROLE_CLAIM).map(String::as_str)
    }
}

impl From<DecodedToken> for AuthIdentity {
    fn from(token: DecodedToken) -> Self {
        let authorities = token.role().map(|r| vec![r.to_string()]).unwrap_or_default();
        Self {
            subject: token.subject,
            authorities,
            claims: token.claims,
        }
    }
}

/// Extracts the identity the gate placed in request extensions.
/// Returns 401 when the request is anonymous.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for AuthIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("authentication required".into()))
    }
}

/// 403 unless the caller holds `authority`.
pub fn require_authority(identity: &AuthIdentity, authority: &str) -> Result<(), AppError> {
    if identity.has_authority(authority) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "authority '{authority}' required"
        )))
    }
}

// ── Gate ────────────────────────────────────────────────────────────────────

/// Why a request proceeds without an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnonymousReason {
    /// No `Authorization` header.
    MissingHeader,
    /// Header present but not `Bearer <token>`.
    MalformedHeader,
    /// The token failed to decode or has expired.
    InvalidToken(TokenError),
}

/// Result of evaluating one request.
#[derive(Debug)]
pub enum GateOutcome {
    /// CORS preflight; answered with an empty 200.
    Preflight,
    /// Path is on the allow-list; forwarded without an identity.
    Exempt,
    /// No usable credential; forwarded without an identity.
    Anonymous(AnonymousReason),
    /// Token matches the subject's live session.
    Authenticated(AuthIdentity),
    /// Short-circuited with this error response.
    Rejected(AppError),
}

/// The authentication gate. Cheap to clone; shares codec, store and policy.
#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
    sessions: Arc<dyn SessionStore>,
    policy: Arc<GatePolicy>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("codec", &self.codec)
            .field("sessions", &self.sessions.backend())
            .field("policy", &self.policy)
            .finish()
    }
}

impl AuthGate {
    /// Build a gate over a shared codec and session store.
    pub fn new(codec: Arc<TokenCodec>, sessions: Arc<dyn SessionStore>, policy: GatePolicy) -> Self {
        Self {
            codec,
            sessions,
            policy: Arc::new(policy),
        }
    }

    /// Decide the fate of one request. Never mutates the session store.
    pub async fn evaluate(&self, method: &Method, path: &str, headers: &HeaderMap) -> GateOutcome {
        if *method == Method::OPTIONS {
            return GateOutcome::Preflight;
        }
        if self.policy.is_exempt(path) {
            tracing::debug!(path, "exempt path, skipping authentication");
            return GateOutcome::Exempt;
        }

        let token = match bearer_token(headers) {
            Ok(token) => token,
            Err(reason) => {
                tracing::debug!(path, ?reason, "no bearer credential, continuing anonymously");
                return GateOutcome::Anonymous(reason);
            }
        };

        let decoded = match self.codec.decode(token) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(path, reason = %e, "bearer token rejected, continuing anonymously");
                return GateOutcome::Anonymous(AnonymousReason::InvalidToken(e));
            }
        };

        match self.sessions.get(&decoded.subject).await {
            Ok(Some(current)) if constant_time_token_eq(token, &current) => {
                tracing::debug!(subject = %decoded.subject, path, "request authenticated");
                GateOutcome::Authenticated(decoded.into())
            }
            Ok(current) => {
                tracing::warn!(
                    subject = %decoded.subject,
                    superseded = current.is_some(),
                    "session revoked or superseded"
                );
                GateOutcome::Rejected(AppError::SessionRevoked)
            }
            Err(e) => {
                tracing::error!(
                    subject = %decoded.subject,
                    backend = self.sessions.backend(),
                    error = %e,
                    "session lookup failed, rejecting request"
                );
                GateOutcome::Rejected(e.into())
            }
        }
    }
}

/// The credential from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AnonymousReason> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AnonymousReason::MissingHeader)?;
    let value = value.to_str().map_err(|_| AnonymousReason::MalformedHeader)?;
    match value.strip_prefix(BEARER_PREFIX).map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AnonymousReason::MalformedHeader),
    }
}

/// Constant-time comparison of the presented token against the stored one.
///
/// When lengths differ, performs a dummy comparison so the timing does not
/// depend on whether the lengths matched.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Axum middleware running [`AuthGate::evaluate`] on every request.
///
/// Install with `axum::middleware::from_fn_with_state(gate, auth_middleware)`.
pub async fn auth_middleware(State(gate): State<AuthGate>, mut request: Request, next: Next) -> Response {
    let outcome = gate
        .evaluate(request.method(), request.uri().path(), request.headers())
        .await;

    match outcome {
        GateOutcome::Preflight => StatusCode::OK.into_response(),
        GateOutcome::Exempt | GateOutcome::Anonymous(_) => next.run(request).await,
        GateOutcome::Authenticated(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        GateOutcome::Rejected(err) => err.into_response(),
    }
}
