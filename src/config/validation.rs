//! Configuration validation module
//!
//! This module provides validation functions for engine configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{SignupError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_engine_config(&settings.engine)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(SignupError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(SignupError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(SignupError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate reservation engine tuning
fn validate_engine_config(config: &super::EngineConfig) -> Result<()> {
    if config.max_retries == 0 {
        return Err(SignupError::Config(
            "Max retries must be greater than 0".to_string()
        ));
    }

    if config.transaction_timeout_ms == 0 {
        return Err(SignupError::Config(
            "Transaction timeout must be greater than 0".to_string()
        ));
    }

    if config.lock_timeout_ms == 0 || config.lock_timeout_ms >= config.transaction_timeout_ms {
        return Err(SignupError::Config(format!(
            "Lock timeout ({} ms) must be greater than 0 and below the transaction timeout ({} ms)",
            config.lock_timeout_ms, config.transaction_timeout_ms
        )));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(SignupError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(SignupError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn test_rejects_inverted_pool_bounds() {
        let mut settings = Settings::default();
        settings.database.min_connections = 20;
        assert!(matches!(validate_settings(&settings), Err(SignupError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_retries_and_timeout() {
        let mut settings = Settings::default();
        settings.engine.max_retries = 0;
        assert!(validate_settings(&settings).is_err());

        let mut settings = Settings::default();
        settings.engine.transaction_timeout_ms = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_lock_timeout_must_stay_below_transaction_timeout() {
        let mut settings = Settings::default();
        settings.engine.lock_timeout_ms = settings.engine.transaction_timeout_ms;
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("Lock timeout"));

        settings.engine.lock_timeout_ms = 0;
        assert!(validate_settings(&settings).is_err());

        settings.engine.lock_timeout_ms = 250;
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }
}
