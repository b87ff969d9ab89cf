//! Engine configuration
//!
//! All values can be overridden through environment variables:
//!
//! | Env var | Default | Meaning |
//! |---------|---------|---------|
//! | STOCKROOM_DATA_DIR | ./data | Directory holding the snapshot database |
//! | STOCKROOM_SAVE_RETRIES | 3 | Save attempts per mutation before deferring |
//! | STOCKROOM_LOG_LEVEL | info | Log level for the tracing subscriber |

use std::path::PathBuf;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory for the snapshot database and log files
    pub data_dir: String,
    /// How many times a snapshot save is attempted per mutation
    pub save_retries: u32,
    /// Log level: trace | debug | info | warn | error
    pub log_level: String,
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("STOCKROOM_DATA_DIR").unwrap_or_else(|_| "./data".into()),
            save_retries: std::env::var("STOCKROOM_SAVE_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            log_level: std::env::var("STOCKROOM_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
        }
    }

    /// Override the data directory, keeping everything else from the
    /// environment. Common in test scenarios.
    pub fn with_data_dir(data_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.data_dir = data_dir.into();
        config
    }

    /// Path of the snapshot database file inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("stockroom.redb")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
            save_retries: 3,
            log_level: "info".into(),
        }
    }
}
