//! # Back Office Configuration
//!
//! Database and settlement settings for the Atelier back office.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ATELIER_DB_PATH=/srv/atelier/atelier.db                            │
//! │     ATELIER_BILL_CODE_ATTEMPTS=64                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/atelier-backoffice/atelier.toml (Linux)                  │
//! │     ~/Library/Application Support/com.atelier.backoffice/atelier.toml  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     32 code attempts, 1 point per 100,000                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # atelier.toml
//! [database]
//! path = "/srv/atelier/atelier.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//! run_migrations = true
//!
//! [settlement]
//! bill_code_attempts = 32
//! points_divisor = 100000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;
use atelier_core::{DEFAULT_BILL_CODE_ATTEMPTS, POINTS_DIVISOR};

// =============================================================================
// Config Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A setting is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// No path was given and no platform config directory exists.
    #[error("No config path available")]
    NoConfigPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// Where the database lives and how the pool is sized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Default: 5
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a settlement waits for the write lock (seconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "atelier", "backoffice")
        .map(|dirs| dirs.data_dir().join("atelier.db"))
        .unwrap_or_else(|| PathBuf::from("./atelier.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Settlement Settings
// =============================================================================

/// Tunables of the settlement engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSettings {
    /// Ceiling on bill code draws (mint collisions plus insert races).
    #[serde(default = "default_bill_code_attempts")]
    pub bill_code_attempts: u32,

    /// Raw spend per loyalty point, in minor units.
    #[serde(default = "default_points_divisor")]
    pub points_divisor: i64,
}

fn default_bill_code_attempts() -> u32 {
    DEFAULT_BILL_CODE_ATTEMPTS
}

fn default_points_divisor() -> i64 {
    POINTS_DIVISOR
}

impl Default for SettlementSettings {
    fn default() -> Self {
        SettlementSettings {
            bill_code_attempts: default_bill_code_attempts(),
            points_divisor: default_points_divisor(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtelierConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub settlement: SettlementSettings,
}

impl AtelierConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (atelier.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
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
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.settlement.bill_code_attempts == 0 {
            return Err(ConfigError::Invalid(
                "settlement.bill_code_attempts must be greater than 0".into(),
            ));
        }

        if self.settlement.points_divisor <= 0 {
            return Err(ConfigError::Invalid(
                "settlement.points_divisor must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `ATELIER_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("ATELIER_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("ATELIER_DB_MAX_CONNECTIONS") {
            match value.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %value, "Ignoring invalid ATELIER_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(value) = lookup("ATELIER_DB_BUSY_TIMEOUT_SECS") {
            match value.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_secs = n,
                Err(_) => warn!(value = %value, "Ignoring invalid ATELIER_DB_BUSY_TIMEOUT_SECS"),
            }
        }

        if let Some(value) = lookup("ATELIER_BILL_CODE_ATTEMPTS") {
            match value.parse::<u32>() {
                Ok(n) => self.settlement.bill_code_attempts = n,
                Err(_) => warn!(value = %value, "Ignoring invalid ATELIER_BILL_CODE_ATTEMPTS"),
            }
        }

        if let Some(value) = lookup("ATELIER_POINTS_DIVISOR") {
            match value.parse::<i64>() {
                Ok(n) => self.settlement.points_divisor = n,
                Err(_) => warn!(value = %value, "Ignoring invalid ATELIER_POINTS_DIVISOR"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "atelier", "backoffice")
            .map(|dirs| dirs.config_dir().join("atelier.toml"))
    }

    /// Pool configuration for [`Database::new`](crate::Database::new).
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
            .run_migrations(self.database.run_migrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AtelierConfig::default();
        assert_eq!(config.settlement.bill_code_attempts, 32);
        assert_eq!(config.settlement.points_divisor, 100_000);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AtelierConfig = toml::from_str(
            r#"
            [settlement]
            bill_code_attempts = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.settlement.bill_code_attempts, 8);
        assert_eq!(config.settlement.points_divisor, 100_000);
        assert!(config.database.run_migrations);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("ATELIER_DB_PATH", "/tmp/shop.db"),
            ("ATELIER_DB_BUSY_TIMEOUT_SECS", "9"),
            ("ATELIER_BILL_CODE_ATTEMPTS", "not-a-number"),
            ("ATELIER_POINTS_DIVISOR", "50000"),
        ]
        .into_iter()
        .collect();

        let mut config = AtelierConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.database.busy_timeout_secs, 9);
        assert_eq!(config.settlement.bill_code_attempts, 32);
        assert_eq!(config.settlement.points_divisor, 50_000);

        let db = config.db_config();
        assert_eq!(db.busy_timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_validation() {
        let mut config = AtelierConfig::default();
        config.settlement.points_divisor = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AtelierConfig::default();
        config.settlement.bill_code_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("atelier.toml");

        let mut config = AtelierConfig::default();
        config.database.path = dir.path().join("atelier.db");
        config.settlement.bill_code_attempts = 16;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[database]"));
        assert!(contents.contains("[settlement]"));

        let parsed: AtelierConfig = toml::from_str(&contents).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atelier.toml");
        std::fs::write(&path, "[settlement\nbill_code_attempts = ").unwrap();

        assert!(matches!(
            AtelierConfig::load(Some(path.clone())),
            Err(ConfigError::Parse(_))
        ));

        let config = AtelierConfig::load_or_default(Some(path));
        assert_eq!(config.settlement, SettlementSettings::default());
    }
}
