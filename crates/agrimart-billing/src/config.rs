//! # Billing Configuration
//!
//! Settings for the engine and the binaries that host it.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     AGRIMART_DATABASE_PATH=/var/lib/agrimart/agrimart.db               │
//! │     AGRIMART_DEFAULT_DUE_DAYS=15                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/agrimart/billing.toml (Linux)                            │
//! │     ~/Library/Application Support/com.agrimart.billing/billing.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # billing.toml
//! [store]
//! name = "AgriMart Shirur"
//!
//! [database]
//! path = "/var/lib/agrimart/agrimart.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [billing]
//! default_due_days = 30
//! low_stock_threshold = 10
//! notifications_enabled = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use agrimart_core::DEFAULT_DUE_DAYS;
use agrimart_db::DbConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Store identity, used in notifications and report headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_name")]
    pub name: String,
}

fn default_store_name() -> String {
    "AgriMart".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
        }
    }
}

/// SQLite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for SQLite's write lock.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "agrimart", "billing")
        .map(|dirs| dirs.data_dir().join("agrimart.db"))
        .unwrap_or_else(|| PathBuf::from("agrimart.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Invoice behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingSettings {
    /// Days from creation to due date when a request gives none.
    #[serde(default = "default_due_days")]
    pub default_due_days: u32,

    /// Products at or below this stock are reported as low.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,

    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

fn default_due_days() -> u32 {
    DEFAULT_DUE_DAYS
}

fn default_low_stock_threshold() -> i64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for BillingSettings {
    fn default() -> Self {
        BillingSettings {
            default_due_days: default_due_days(),
            low_stock_threshold: default_low_stock_threshold(),
            notifications_enabled: true,
        }
    }
}

// =============================================================================
// BillingConfig
// =============================================================================

/// Complete billing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub billing: BillingSettings,
}

impl BillingConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (billing.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading billing config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load billing config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Billing config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.name.trim().is_empty() {
            return Err(ConfigError::Invalid("store.name must not be empty".into()));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.billing.default_due_days > 365 {
            return Err(ConfigError::Invalid(
                "billing.default_due_days must be at most 365".into(),
            ));
        }

        if self.billing.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "billing.low_stock_threshold must not be negative".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("AGRIMART_STORE_NAME") {
            self.store.name = name;
        }

        if let Ok(path) = std::env::var("AGRIMART_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("AGRIMART_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid AGRIMART_MAX_CONNECTIONS"),
            }
        }

        if let Ok(ms) = std::env::var("AGRIMART_BUSY_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring invalid AGRIMART_BUSY_TIMEOUT_MS"),
            }
        }

        if let Ok(days) = std::env::var("AGRIMART_DEFAULT_DUE_DAYS") {
            match days.parse::<u32>() {
                Ok(n) => self.billing.default_due_days = n,
                Err(_) => warn!(value = %days, "Ignoring invalid AGRIMART_DEFAULT_DUE_DAYS"),
            }
        }

        if let Ok(threshold) = std::env::var("AGRIMART_LOW_STOCK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(n) => self.billing.low_stock_threshold = n,
                Err(_) => warn!(value = %threshold, "Ignoring invalid AGRIMART_LOW_STOCK_THRESHOLD"),
            }
        }

        if let Ok(flag) = std::env::var("AGRIMART_NOTIFICATIONS") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => self.billing.notifications_enabled = true,
                "0" | "false" | "off" | "no" => self.billing.notifications_enabled = false,
                _ => warn!(value = %flag, "Ignoring invalid AGRIMART_NOTIFICATIONS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "agrimart", "billing")
            .map(|dirs| dirs.config_dir().join("billing.toml"))
    }

    /// Pool settings for [`agrimart_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BillingConfig::default();
        assert_eq!(config.billing.default_due_days, 30);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.billing.notifications_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = BillingConfig::default();

        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 2;
        config.billing.default_due_days = 400;
        assert!(config.validate().is_err());

        config.billing.default_due_days = 15;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: BillingConfig = toml::from_str(
            r#"
            [billing]
            default_due_days = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.billing.default_due_days, 7);
        assert_eq!(config.billing.low_stock_threshold, 10);
        assert_eq!(config.store.name, "AgriMart");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("billing.toml");

        let mut config = BillingConfig::default();
        config.store.name = "AgriMart Khanna".to_string();
        config.database.path = dir.path().join("agrimart.db");
        config.save(Some(path.clone())).unwrap();

        let loaded = BillingConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.store.name, "AgriMart Khanna");
        assert_eq!(loaded.database.path, dir.path().join("agrimart.db"));
    }
}
