//! Store configuration
//!
//! Connection and sync settings for the feature store. Defaults are layered
//! under `TRACK_FEATURES_*` environment overrides so deployments can point
//! the store at a different database file or tighten the sync timeout
//! without code changes.

use crate::error::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "track_features.db";
const DEFAULT_POOL_SIZE: usize = 20;
const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 30;

/// Configuration for opening a [`FeatureStore`](crate::store::FeatureStore)
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,

    /// Maximum number of pooled read connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Upper bound on a whole sync operation, in seconds. Expiry rolls the
    /// apply transaction back and surfaces as a retryable store error.
    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

fn default_sync_timeout_secs() -> u64 {
    DEFAULT_SYNC_TIMEOUT_SECS
}

impl StoreConfig {
    /// Configuration with defaults for everything but the database path.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            pool_size: DEFAULT_POOL_SIZE,
            sync_timeout_secs: DEFAULT_SYNC_TIMEOUT_SECS,
        }
    }

    /// Load configuration from the environment.
    ///
    /// Recognized variables: `TRACK_FEATURES_DB_PATH`,
    /// `TRACK_FEATURES_POOL_SIZE`, `TRACK_FEATURES_SYNC_TIMEOUT_SECS`.
    /// Unset variables fall back to defaults.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("pool_size", DEFAULT_POOL_SIZE as u64)?
            .set_default("sync_timeout_secs", DEFAULT_SYNC_TIMEOUT_SECS)?
            .add_source(config::Environment::with_prefix("TRACK_FEATURES"))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }
}
