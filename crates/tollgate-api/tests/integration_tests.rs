//! # Integration Tests for tollgate-api
//!
//! Drives the full router in-process: registration, login, the
//! authentication gate, logout semantics, single-session policy, exempt
//! paths, store outages, health probes and the OpenAPI document.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tollgate_api::config::AppConfig;
use tollgate_api::password::{BcryptHasher, PasswordError, PasswordHasher};
use tollgate_api::state::AppState;
use tollgate_api::users::{InMemoryUserStore, UserRecord, UserStore, ADMIN_ROLE, DEFAULT_ROLE};
use tollgate_core::{Claims, SigningSecret, TokenCodec};
use tollgate_session::{MemorySessionStore, SessionError, SessionStore};

const SECRET: &str = "integration-test-secret-integration-test";

/// bcrypt cost 4 keeps the suite fast.
fn config() -> AppConfig {
    let mut config = AppConfig::new(SigningSecret::new(SECRET).unwrap());
    config.bcrypt_cost = 4;
    config
}

struct Harness {
    app: axum::Router,
    sessions: MemorySessionStore,
    users: InMemoryUserStore,
}

/// Helper: build the app over inspectable in-memory stores.
fn harness() -> Harness {
    let sessions = MemorySessionStore::new();
    let users = InMemoryUserStore::new();
    let state = AppState::new(
        config(),
        Arc::new(sessions.clone()),
        Arc::new(users.clone()),
        Arc::new(BcryptHasher::new(4)),
    )
    .unwrap();
    Harness {
        app: tollgate_api::app(state),
        sessions,
        users,
    }
}

/// Session store whose every call fails.
struct DownStore;

#[async_trait]
impl SessionStore for DownStore {
    async fn put(&self, _: &str, _: &str, _: Duration) -> Result<(), SessionError> {
        Err(SessionError::Unavailable("connection refused".into()))
    }
    async fn get(&self, _: &str) -> Result<Option<String>, SessionError> {
        Err(SessionError::Timeout { timeout_ms: 500 })
    }
    async fn delete(&self, _: &str) -> Result<(), SessionError> {
        Err(SessionError::Unavailable("connection refused".into()))
    }
    async fn ping(&self) -> Result<(), SessionError> {
        Err(SessionError::Unavailable("connection refused".into()))
    }
    fn backend(&self) -> &'static str {
        "down"
    }
}

/// bcrypt hasher that counts verification calls.
struct CountingHasher {
    inner: BcryptHasher,
    verifications: Arc<AtomicUsize>,
}

#[async_trait]
impl PasswordHasher for CountingHasher {
    async fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        self.inner.hash(plaintext).await
    }
    async fn matches(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordError> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        self.inner.matches(plaintext, hash).await
    }
    fn decoy_hash(&self) -> &str {
        self.inner.decoy_hash()
    }
}

async fn call(
    app: &axum::Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

async fn register(app: &axum::Router, username: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/register",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await
}

async fn login(app: &axum::Router, username: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/login",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await
}

async fn login_token(app: &axum::Router, username: &str, password: &str) -> String {
    let (status, body) = login(app, username, password).await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn seed_admin(users: &InMemoryUserStore, username: &str, password: &str) {
    let hash = BcryptHasher::new(4).hash(password).await.unwrap();
    users
        .save(UserRecord::new(username, hash, ADMIN_ROLE))
        .await
        .unwrap();
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn test_readiness_probe() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ready".into()));
}

#[tokio::test]
async fn test_readiness_fails_when_store_down() {
    let state = AppState::new(
        config(),
        Arc::new(DownStore),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(BcryptHasher::new(4)),
    )
    .unwrap();
    let app = tollgate_api::app(state);
    let (status, _) = call(&app, Method::GET, "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// -- Registration -------------------------------------------------------------

#[tokio::test]
async fn test_register_creates_user_with_default_role() {
    let h = harness();
    let (status, body) = register(&h.app, "alice", "correct horse").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], DEFAULT_ROLE);

    let stored = h.users.find_by_username("alice").await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "correct horse");
    assert_eq!(stored.role, DEFAULT_ROLE);
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let h = harness();
    register(&h.app, "alice", "correct horse").await;
    let (status, body) = register(&h.app, "alice", "another password").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(h.users.len(), 1);
}

#[tokio::test]
async fn test_register_validation() {
    let h = harness();
    for (username, password) in [("", "correct horse"), ("a b", "correct horse"), ("alice", "short")] {
        let (status, body) = register(&h.app, username, password).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{username:?}/{password:?}");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
    assert!(h.users.is_empty());
}

#[tokio::test]
async fn test_register_malformed_json_is_bad_request() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/register")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// -- Login --------------------------------------------------------------------

#[tokio::test]
async fn test_login_returns_bearer_token_and_records_session() {
    let h = harness();
    register(&h.app, "alice", "correct horse").await;

    let (status, body) = login(&h.app, "alice", "correct horse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["expires_at"].is_string());

    let token = body["token"].as_str().unwrap();
    assert_eq!(h.sessions.get("alice").await.unwrap().as_deref(), Some(token));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let h = harness();
    register(&h.app, "alice", "correct horse").await;

    let (s1, unknown) = login(&h.app, "mallory", "correct horse").await;
    let (s2, wrong) = login(&h.app, "alice", "battery staple").await;

    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
    assert_eq!(unknown["error"]["code"], "INVALID_CREDENTIALS");
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn test_every_login_failure_pays_for_a_hash_check() {
    let users = InMemoryUserStore::new();
    let hash = BcryptHasher::new(4).hash("correct horse").await.unwrap();
    let mut disabled = UserRecord::new("carol", hash.clone(), DEFAULT_ROLE);
    disabled.enabled = false;
    users.save(disabled).await.unwrap();
    users
        .save(UserRecord::new("alice", hash, DEFAULT_ROLE))
        .await
        .unwrap();

    let verifications = Arc::new(AtomicUsize::new(0));
    let state = AppState::new(
        config(),
        Arc::new(MemorySessionStore::new()),
        Arc::new(users),
        Arc::new(CountingHasher {
            inner: BcryptHasher::new(4),
            verifications: Arc::clone(&verifications),
        }),
    )
    .unwrap();
    let app = tollgate_api::app(state);

    for (username, password) in [
        ("mallory", "correct horse"),
        ("carol", "correct horse"),
        ("alice", "battery staple"),
    ] {
        let before = verifications.load(Ordering::SeqCst);
        let (status, body) = login(&app, username, password).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{username}");
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
        assert_eq!(verifications.load(Ordering::SeqCst), before + 1, "{username}");
    }
}

#[tokio::test]
async fn test_disabled_account_cannot_log_in() {
    let h = harness();
    let hash = BcryptHasher::new(4).hash("correct horse").await.unwrap();
    let mut user = UserRecord::new("carol", hash, DEFAULT_ROLE);
    user.enabled = false;
    h.users.save(user).await.unwrap();

    let (status, body) = login(&h.app, "carol", "correct horse").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_with_store_down_is_503() {
    let users = InMemoryUserStore::new();
    seed_admin(&users, "root", "correct horse").await;
    let state = AppState::new(
        config(),
        Arc::new(DownStore),
        Arc::new(users),
        Arc::new(BcryptHasher::new(4)),
    )
    .unwrap();
    let app = tollgate_api::app(state);

    let (status, body) = login(&app, "root", "correct horse").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");
    assert!(body.get("token").is_none());
}

// -- End-to-end Scenario ------------------------------------------------------

#[tokio::test]
async fn test_login_access_logout_reject() {
    let h = harness();
    register(&h.app, "a", "password-p").await;
    let t1 = login_token(&h.app, "a", "password-p").await;

    let (status, body) = call(&h.app, Method::GET, "/me", Some(&t1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subject"], "a");
    assert_eq!(body["role"], DEFAULT_ROLE);

    let (status, _) = call(&h.app, Method::POST, "/logout", Some(&t1), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&h.app, Method::GET, "/me", Some(&t1), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "SESSION_INVALID");
}

#[tokio::test]
async fn test_relogin_after_logout_keeps_old_token_revoked() {
    let h = harness();
    register(&h.app, "alice", "correct horse").await;
    let t1 = login_token(&h.app, "alice", "correct horse").await;

    let (status, _) = call(&h.app, Method::POST, "/logout", Some(&t1), None).await;
    assert_eq!(status, StatusCode::OK);

    let t2 = login_token(&h.app, "alice", "correct horse").await;
    assert_ne!(t1, t2);

    let (status, body) = call(&h.app, Method::GET, "/me", Some(&t1), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "SESSION_INVALID");

    let (status, _) = call(&h.app, Method::GET, "/me", Some(&t2), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_second_login_revokes_first_token() {
    let h = harness();
    register(&h.app, "alice", "correct horse").await;
    let first = login_token(&h.app, "alice", "correct horse").await;

    let second = login_token(&h.app, "alice", "correct horse").await;
    assert_ne!(first, second);

    let (status, body) = call(&h.app, Method::GET, "/me", Some(&first), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "SESSION_INVALID");

    let (status, _) = call(&h.app, Method::GET, "/me", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);
}

// -- Logout -------------------------------------------------------------------

#[tokio::test]
async fn test_logout_is_idempotent() {
    let h = harness();
    register(&h.app, "alice", "correct horse").await;
    let token = login_token(&h.app, "alice", "correct horse").await;

    let (s1, b1) = call(&h.app, Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(s1, StatusCode::OK);
    assert!(h.sessions.is_empty());

    let (s2, b2) = call(&h.app, Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(b1, b2);
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn test_logout_never_fails() {
    let h = harness();
    let (status, _) = call(&h.app, Method::POST, "/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&h.app, Method::POST, "/logout", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::OK);

    let state = AppState::new(
        config(),
        Arc::new(DownStore),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(BcryptHasher::new(4)),
    )
    .unwrap();
    let codec = TokenCodec::new(&SigningSecret::new(SECRET).unwrap(), Duration::from_secs(60)).unwrap();
    let token = codec.encode("alice", &Claims::new()).unwrap();
    let app = tollgate_api::app(state);
    let (status, _) = call(&app, Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_with_expired_token_still_revokes() {
    let h = harness();
    let codec = TokenCodec::new(&SigningSecret::new(SECRET).unwrap(), Duration::from_secs(60)).unwrap();
    let stale = codec
        .encode_at("alice", &Claims::new(), chrono::Utc::now() - chrono::Duration::hours(2))
        .unwrap();
    h.sessions.put("alice", &stale, Duration::from_secs(3600)).await.unwrap();

    let (status, _) = call(&h.app, Method::POST, "/logout", Some(&stale), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.sessions.get("alice").await.unwrap().is_none());
}

// -- Gate Behaviour -----------------------------------------------------------

#[tokio::test]
async fn test_protected_route_requires_identity() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_expired_token_treated_as_anonymous() {
    let h = harness();
    let codec = TokenCodec::new(&SigningSecret::new(SECRET).unwrap(), Duration::from_secs(60)).unwrap();
    let stale = codec
        .encode_at("alice", &Claims::new(), chrono::Utc::now() - chrono::Duration::hours(2))
        .unwrap();
    h.sessions.put("alice", &stale, Duration::from_secs(3600)).await.unwrap();

    let (status, body) = call(&h.app, Method::GET, "/me", Some(&stale), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_forged_token_treated_as_anonymous() {
    let h = harness();
    register(&h.app, "alice", "correct horse").await;
    login_token(&h.app, "alice", "correct horse").await;

    let forger = TokenCodec::new(
        &SigningSecret::new("not-the-server-secret-not-the-server").unwrap(),
        Duration::from_secs(60),
    )
    .unwrap();
    let forged = forger.encode("alice", &Claims::new()).unwrap();

    let (status, body) = call(&h.app, Method::GET, "/me", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_exempt_paths_ignore_store_state() {
    let state = AppState::new(
        config(),
        Arc::new(DownStore),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(BcryptHasher::new(4)),
    )
    .unwrap();
    let app = tollgate_api::app(state);

    let (status, _) = call(&app, Method::GET, "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = register(&app, "alice", "correct horse").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_store_outage_fails_closed_on_protected_route() {
    let users = InMemoryUserStore::new();
    let state = AppState::new(
        config(),
        Arc::new(DownStore),
        Arc::new(users),
        Arc::new(BcryptHasher::new(4)),
    )
    .unwrap();
    let app = tollgate_api::app(state);
    let codec = TokenCodec::new(&SigningSecret::new(SECRET).unwrap(), Duration::from_secs(60)).unwrap();
    let token = codec.encode("alice", &Claims::new()).unwrap();

    let (status, body) = call(&app, Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");
}

#[tokio::test]
async fn test_preflight_bypasses_gate() {
    let h = harness();
    let (status, _) = call(&h.app, Method::OPTIONS, "/admin/data", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

// -- Authorization ------------------------------------------------------------

#[tokio::test]
async fn test_admin_route_requires_admin_authority() {
    let h = harness();
    register(&h.app, "alice", "correct horse").await;
    seed_admin(&h.users, "root", "correct horse").await;

    let user_token = login_token(&h.app, "alice", "correct horse").await;
    let (status, body) = call(&h.app, Method::POST, "/admin/data", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let admin_token = login_token(&h.app, "root", "correct horse").await;
    let (status, body) = call(&h.app, Method::POST, "/admin/data", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subject"], "root");

    let (status, _) = call(&h.app, Method::POST, "/admin/data", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_document_served() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/login"].is_object());
    assert!(body["paths"]["/admin/data"].is_object());
}
