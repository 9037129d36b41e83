use crate::errors::{AppError, AppResult};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const BIND_ADDR_VAR: &str = "POKEBOX_BIND_ADDR";
pub const DATABASE_PATH_VAR: &str = "POKEBOX_DATABASE_PATH";
pub const POOL_SIZE_VAR: &str = "POKEBOX_POOL_SIZE";
pub const LOG_DIR_VAR: &str = "POKEBOX_LOG_DIR";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATABASE_PATH: &str = "data/pokebox.db";
const DEFAULT_POOL_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub pool_size: usize,
    /// JSON logs roll daily into this directory when set, otherwise go to stdout.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            pool_size: DEFAULT_POOL_SIZE,
            log_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from a key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let bind_raw = value(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|err| AppError::Config(format!("{BIND_ADDR_VAR}={bind_raw:?}: {err}")))?;

        let pool_size = match value(POOL_SIZE_VAR) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(AppError::Config(format!(
                        "{POOL_SIZE_VAR}={raw:?}: expected a positive integer"
                    )))
                }
            },
            None => DEFAULT_POOL_SIZE,
        };

        Ok(Self {
            bind_addr,
            database_path: value(DATABASE_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            pool_size,
            log_dir: value(LOG_DIR_VAR).map(PathBuf::from),
        })
    }
}
