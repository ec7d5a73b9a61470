//! # Observability Configuration
//!
//! Environment-specific logging settings.

use std::env;

use crate::errors::{AppError, AppResult};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for crate components
    pub log_level: String,
    /// Log output format override ("pretty" or "json")
    pub log_format: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: None,
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").ok(),
        }
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Whether logs should use the human-readable formatter
    pub fn use_pretty_logs(&self) -> bool {
        match self.log_format.as_deref() {
            Some("pretty") => true,
            Some(_) => false,
            None => self.is_development(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.environment.trim().is_empty() {
            return Err(AppError::Config("environment cannot be empty".to_string()));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Invalid log level: {}",
                self.log_level
            )));
        }
        if let Some(format) = &self.log_format {
            if format != "pretty" && format != "json" {
                return Err(AppError::Config(format!(
                    "Invalid log format: {} (expected 'pretty' or 'json')",
                    format
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pretty_development() {
        let config = ObservabilityConfig::default();
        assert!(config.is_development());
        assert!(!config.is_production());
        assert!(config.use_pretty_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_format_overrides_environment() {
        let config = ObservabilityConfig {
            log_format: Some("json".to_string()),
            ..Default::default()
        };
        assert!(!config.use_pretty_logs());

        let config = ObservabilityConfig {
            environment: "production".to_string(),
            log_format: Some("pretty".to_string()),
            ..Default::default()
        };
        assert!(config.use_pretty_logs());
    }

    #[test]
    fn test_validation_rejects_unknown_values() {
        let config = ObservabilityConfig {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ObservabilityConfig {
            log_format: Some("xml".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
