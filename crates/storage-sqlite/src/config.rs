//! Store configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::db::get_db_path;
use spendbook_core::errors::{Error, Result};

pub const DEFAULT_POOL_SIZE: u32 = 8;
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 30_000;

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "SPENDBOOK_DATA_DIR";
/// Environment variable overriding the pool size.
pub const POOL_SIZE_ENV: &str = "SPENDBOOK_DB_POOL_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// SQLite database file.
    pub db_path: String,
    /// Maximum pooled read connections; the writer takes one of them.
    pub pool_size: u32,
    pub connection_timeout: Duration,
    pub busy_timeout_ms: u32,
    /// Drop and recreate every table when migrations fail on an existing file.
    pub recreate_on_incompatible_schema: bool,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            pool_size: DEFAULT_POOL_SIZE,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            recreate_on_incompatible_schema: true,
        }
    }

    /// `<data_dir>/spendbook.db`, or `DATABASE_URL` when it is set.
    pub fn from_data_dir(data_dir: &str) -> Self {
        Self::new(get_db_path(data_dir))
    }

    /// Reads `SPENDBOOK_DATA_DIR` (default `.`) and `SPENDBOOK_DB_POOL_SIZE`.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| ".".to_string());
        let mut config = Self::from_data_dir(&data_dir);
        if let Ok(raw) = std::env::var(POOL_SIZE_ENV) {
            config.pool_size = raw.trim().parse().map_err(|_| {
                Error::InvalidConfigValue(format!(
                    "{} must be a positive integer, got '{}'",
                    POOL_SIZE_ENV, raw
                ))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_recreate_on_incompatible_schema(mut self, recreate: bool) -> Self {
        self.recreate_on_incompatible_schema = recreate;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.db_path.trim().is_empty() {
            return Err(Error::InvalidConfigValue(
                "database path cannot be empty".to_string(),
            ));
        }
        // One connection is held by the writer for its whole lifetime.
        if self.pool_size < 2 {
            return Err(Error::InvalidConfigValue(format!(
                "pool size must be at least 2, got {}",
                self.pool_size
            )));
        }
        Ok(())
    }
}
