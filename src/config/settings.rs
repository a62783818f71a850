//! Engine settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    pub permissions: PermissionsConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

/// Reservation and promotion tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Attempts after the first one when a unit of work hits a conflict
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Upper bound for a single unit of work, including lock waits
    pub transaction_timeout_ms: u64,
    /// Postgres `lock_timeout` for slot row locks. Kept below
    /// `transaction_timeout_ms` so a long lock wait is retried as a conflict.
    pub lock_timeout_ms: u64,
}

/// Administrative permission configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PermissionsConfig {
    pub admin_ids: Vec<i64>,
}

/// Notification collaborator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
    pub enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

impl EngineConfig {
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_base_delay_ms: 10,
            transaction_timeout_ms: 5_000,
            lock_timeout_ms: 1_000,
        }
    }
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = Settings::default();
        let settings = config::Config::builder()
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", i64::from(defaults.database.max_connections))?
            .set_default("database.min_connections", i64::from(defaults.database.min_connections))?
            .set_default("database.acquire_timeout_seconds", defaults.database.acquire_timeout_seconds as i64)?
            .set_default("engine.max_retries", i64::from(defaults.engine.max_retries))?
            .set_default("engine.retry_base_delay_ms", defaults.engine.retry_base_delay_ms as i64)?
            .set_default("engine.transaction_timeout_ms", defaults.engine.transaction_timeout_ms as i64)?
            .set_default("engine.lock_timeout_ms", defaults.engine.lock_timeout_ms as i64)?
            .set_default("permissions.admin_ids", Vec::<i64>::new())?
            .set_default("notifications.enabled", defaults.notifications.enabled)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.file_path", defaults.logging.file_path)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("SIGNUP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("permissions.admin_ids")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::SignupError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/signups".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_seconds: 30,
            },
            engine: EngineConfig::default(),
            permissions: PermissionsConfig { admin_ids: vec![] },
            notifications: NotificationsConfig { enabled: true },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs".to_string(),
            },
        }
    }
}
