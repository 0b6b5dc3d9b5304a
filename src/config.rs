//! Runtime settings for the dispatch service, read from `DISPATCH_*` variables.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_ROSTER_LIMIT: usize = 5;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Settings for ingest and storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Explicit database file; `None` means the platform data directory.
    pub db_path: Option<PathBuf>,
    /// Maximum number of active agents a single upload is split across.
    pub roster_limit: usize,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            roster_limit: DEFAULT_ROSTER_LIMIT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = env::var("DISPATCH_DB_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let roster_limit = positive_var("DISPATCH_ROSTER_LIMIT", DEFAULT_ROSTER_LIMIT)?;
        let max_upload_bytes =
            positive_var("DISPATCH_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        Ok(Self {
            db_path,
            roster_limit,
            max_upload_bytes,
        })
    }
}

fn positive_var(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };

    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber { name, value: raw }),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}
