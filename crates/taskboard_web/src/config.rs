//! Process configuration loaded from the environment.
//!
//! # Responsibility
//! - Read an optional `.env` file, then `TASKBOARD_*` variables.
//! - Turn them into a validated `WebConfig`; anything invalid is fatal at boot.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use taskboard_core::{default_log_level, StoreConfig};

pub const ENV_DB_PATH: &str = "TASKBOARD_DB_PATH";
pub const ENV_BIND: &str = "TASKBOARD_BIND";
pub const ENV_STATIC_DIR: &str = "TASKBOARD_STATIC_DIR";
pub const ENV_LOG_LEVEL: &str = "TASKBOARD_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKBOARD_LOG_DIR";
pub const ENV_OP_TIMEOUT_MS: &str = "TASKBOARD_OP_TIMEOUT_MS";

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_STATIC_DIR: &str = "public";
const DEFAULT_OP_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug)]
pub enum ConfigError {
    /// `.env` exists but could not be parsed.
    DotEnv(dotenvy::Error),
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DotEnv(err) => write!(f, "failed to load .env: {err}"),
            Self::Missing(key) => write!(f, "missing required setting `{key}`"),
            Self::Invalid { key, value } => write!(f, "invalid value `{value}` for `{key}`"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DotEnv(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub static_dir: PathBuf,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub op_timeout: Duration,
}

impl WebConfig {
    /// Loads `.env` (when present) into the process environment, then reads it.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(ConfigError::DotEnv(err)),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = get(ENV_DB_PATH)
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing(ENV_DB_PATH))?;

        let bind_text = get(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_text
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid {
                key: ENV_BIND,
                value: bind_text.clone(),
            })?;

        let op_timeout_ms = match get(ENV_OP_TIMEOUT_MS) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::Invalid {
                    key: ENV_OP_TIMEOUT_MS,
                    value,
                })?,
            None => DEFAULT_OP_TIMEOUT_MS,
        };

        Ok(Self {
            db_path,
            bind,
            static_dir: PathBuf::from(
                get(ENV_STATIC_DIR).unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
            ),
            log_level: get(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: get(ENV_LOG_DIR),
            op_timeout: Duration::from_millis(op_timeout_ms),
        })
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::file(&self.db_path).with_op_timeout(Some(self.op_timeout))
    }
}
