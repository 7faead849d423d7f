//! Configuration validation module
//! 
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{CharismError, Result};
use super::{Settings, StoreBackend};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.store.backend == StoreBackend::Postgres {
        validate_database_config(&settings.database)?;
    }
    validate_store_config(&settings.store)?;
    validate_notifier_config(&settings.notifier)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(CharismError::Config(
            "Database URL is required".to_string()
        ));
    }
    
    if config.max_connections == 0 {
        return Err(CharismError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }
    
    if config.min_connections > config.max_connections {
        return Err(CharismError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }
    
    Ok(())
}

/// Validate store access policy
fn validate_store_config(config: &super::StoreConfig) -> Result<()> {
    if config.timeout_ms == 0 {
        return Err(CharismError::Config(
            "Store timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate notifier configuration
fn validate_notifier_config(config: &super::NotifierConfig) -> Result<()> {
    if let Some(url) = &config.webhook_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CharismError::Config(
                format!("Webhook URL must be http(s): {}", url)
            ));
        }
    }

    if config.timeout_seconds == 0 {
        return Err(CharismError::Config(
            "Notifier timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(CharismError::Config(
            "Log level is required".to_string()
        ));
    }
    
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(CharismError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }
    
    Ok(())
}
