//! # tollgate-api — Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to the configured port (default 8080).

use std::sync::Arc;

use tollgate_api::config::AppConfig;
use tollgate_api::db::users::PgUserStore;
use tollgate_api::password::BcryptHasher;
use tollgate_api::state::AppState;
use tollgate_api::users::{InMemoryUserStore, UserStore};
use tollgate_session::{MemorySessionStore, RedisSessionStore, SessionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration failed: {e}");
        e
    })?;
    if config.signing_secret.is_weak() {
        tracing::warn!("TOLLGATE_JWT_SECRET is shorter than 32 bytes; use a longer random secret");
    }
    tracing::info!(?config, "configuration loaded");

    let sessions: Arc<dyn SessionStore> = match config.redis_url.as_deref() {
        Some(url) => Arc::new(
            RedisSessionStore::connect(url, config.store_timeout)
                .await
                .map_err(|e| {
                    tracing::error!("Session store connection failed: {e}");
                    e
                })?,
        ),
        None => {
            tracing::warn!(
                "REDIS_URL not set, keeping sessions in memory. \
                 Sessions are lost on restart and not shared between instances."
            );
            Arc::new(MemorySessionStore::new())
        }
    };

    let users: Arc<dyn UserStore> = match tollgate_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })? {
        Some(pool) => Arc::new(PgUserStore::new(pool)),
        None => Arc::new(InMemoryUserStore::new()),
    };

    let passwords = Arc::new(BcryptHasher::new(config.bcrypt_cost));
    let port = config.port;

    let state = AppState::new(config, sessions, users, passwords)?;
    let app = tollgate_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Tollgate API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` filter (default `info`); JSON lines when
/// `TOLLGATE_LOG_FORMAT=json`.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("TOLLGATE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
