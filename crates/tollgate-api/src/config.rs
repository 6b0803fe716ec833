//! # Service Configuration
//!
//! [`AppConfig`] is assembled from environment variables, optionally layered
//! over a YAML file named by `TOLLGATE_CONFIG`. Environment values win.
//!
//! | Field | Variable | Default |
//! |-------|----------|---------|
//! | `port` | `PORT` | `8080` |
//! | `signing_secret` | `TOLLGATE_JWT_SECRET` | required |
//! | `token_lifetime` | `TOLLGATE_TOKEN_TTL_SECS` | `3600` |
//! | `session_ttl` | `TOLLGATE_SESSION_TTL_SECS` | token lifetime |
//! | `exempt_paths` | `TOLLGATE_EXEMPT_PATHS` | [`DEFAULT_EXEMPT_PATHS`] |
//! | `redis_url` | `REDIS_URL` | unset (in-memory sessions) |
//! | `store_timeout` | `TOLLGATE_STORE_TIMEOUT_MS` | `500` |
//! | `bcrypt_cost` | `TOLLGATE_BCRYPT_COST` | `bcrypt::DEFAULT_COST` |
//!
//! Both lifetimes must lie in `1..=315360000` seconds (ten years).

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tollgate_core::{SigningSecret, TokenError};

/// Paths that bypass the authentication gate unless overridden.
pub const DEFAULT_EXEMPT_PATHS: &[&str] = &[
    "/login",
    "/logout",
    "/register",
    "/openapi.json",
    "/swagger-ui/**",
    "/health/**",
];

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 500;
/// Upper bound for token and session lifetimes: ten years.
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required setting {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("failed to read config file {}: {source}", .path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// YAML overlay. Every field is optional; absent fields fall through to
/// environment or defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    port: Option<u16>,
    jwt_secret: Option<String>,
    token_ttl_secs: Option<u64>,
    session_ttl_secs: Option<u64>,
    exempt_paths: Option<Vec<String>>,
    redis_url: Option<String>,
    store_timeout_ms: Option<u64>,
    bcrypt_cost: Option<u32>,
}

/// Application configuration.
///
/// Custom `Debug` redacts the signing secret and the Redis URL, which may
/// embed a password.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub signing_secret: SigningSecret,
    pub token_lifetime: Duration,
    pub session_ttl: Duration,
    pub exempt_paths: Vec<String>,
    pub redis_url: Option<String>,
    pub store_timeout: Duration,
    pub bcrypt_cost: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("signing_secret", &"[REDACTED]")
            .field("token_lifetime", &self.token_lifetime)
            .field("session_ttl", &self.session_ttl)
            .field("exempt_paths", &self.exempt_paths)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("store_timeout", &self.store_timeout)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl AppConfig {
    /// Defaults around an explicit secret. Sessions and users stay in memory.
    pub fn new(signing_secret: SigningSecret) -> Self {
        let token_lifetime = Duration::from_secs(DEFAULT_TOKEN_TTL_SECS);
        Self {
            port: DEFAULT_PORT,
            signing_secret,
            token_lifetime,
            session_ttl: token_lifetime,
            exempt_paths: DEFAULT_EXEMPT_PATHS.iter().map(|p| p.to_string()).collect(),
            redis_url: None,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let file = match lookup("TOLLGATE_CONFIG") {
            Some(path) => load_file(Path::new(&path))?,
            None => FileConfig::default(),
        };

        let secret = lookup("TOLLGATE_JWT_SECRET")
            .or(file.jwt_secret)
            .ok_or(ConfigError::Missing("TOLLGATE_JWT_SECRET"))?;
        let mut config = Self::new(SigningSecret::new(secret)?);

        if let Some(port) = parse_var(&lookup, "PORT")?.or(file.port) {
            config.port = port;
        }

        let token_ttl = parse_var(&lookup, "TOLLGATE_TOKEN_TTL_SECS")?
            .or(file.token_ttl_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        config.token_lifetime = ttl_secs("TOLLGATE_TOKEN_TTL_SECS", token_ttl)?;

        let session_ttl = parse_var(&lookup, "TOLLGATE_SESSION_TTL_SECS")?
            .or(file.session_ttl_secs)
            .unwrap_or(token_ttl);
        config.session_ttl = ttl_secs("TOLLGATE_SESSION_TTL_SECS", session_ttl)?;

        if let Some(paths) = lookup("TOLLGATE_EXEMPT_PATHS") {
            config.exempt_paths = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        } else if let Some(paths) = file.exempt_paths {
            config.exempt_paths = paths;
        }

        config.redis_url = lookup("REDIS_URL").or(file.redis_url);

        let timeout_ms = parse_var(&lookup, "TOLLGATE_STORE_TIMEOUT_MS")?
            .or(file.store_timeout_ms)
            .unwrap_or(DEFAULT_STORE_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "TOLLGATE_STORE_TIMEOUT_MS",
                reason: "must be greater than zero".into(),
            });
        }
        config.store_timeout = Duration::from_millis(timeout_ms);

        if let Some(cost) = parse_var(&lookup, "TOLLGATE_BCRYPT_COST")?.or(file.bcrypt_cost) {
            if !(4..=31).contains(&cost) {
                return Err(ConfigError::Invalid {
                    var: "TOLLGATE_BCRYPT_COST",
                    reason: format!("{cost} is outside 4..=31"),
                });
            }
            config.bcrypt_cost = cost;
        }

        Ok(config)
    }
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::File {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn ttl_secs(var: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".into(),
        });
    }
    if secs > MAX_TTL_SECS {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("{secs} exceeds the maximum of {MAX_TTL_SECS} seconds"),
        });
    }
    Ok(Duration::from_secs(secs))
}
