//! # OCR Configuration Module
//!
//! This module defines configuration structures for label recognition,
//! including recovery settings, engine parameters and input limits.

use crate::errors::{AppError, AppResult};

/// Nutrition labels scanned by the app are printed in Thai
pub const DEFAULT_LANGUAGES: &str = "tha";
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit for image files

/// Recovery configuration for error handling
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Timeout for a single recognition attempt in seconds
    pub operation_timeout_secs: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 5000,
            operation_timeout_secs: 30,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60,
        }
    }
}

impl RecoveryConfig {
    /// Validate recovery configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.base_retry_delay_ms == 0 {
            return Err(AppError::Config(
                "base_retry_delay_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_retry_delay_ms < self.base_retry_delay_ms {
            return Err(AppError::Config(format!(
                "max_retry_delay_ms ({}) must be >= base_retry_delay_ms ({})",
                self.max_retry_delay_ms, self.base_retry_delay_ms
            )));
        }
        if self.operation_timeout_secs == 0 {
            return Err(AppError::Config(
                "operation_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.circuit_breaker_threshold == 0 {
            return Err(AppError::Config(
                "circuit_breaker_threshold must be greater than 0".to_string(),
            ));
        }
        if self.circuit_breaker_reset_secs == 0 {
            return Err(AppError::Config(
                "circuit_breaker_reset_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Page Segmentation Mode for Tesseract OCR
///
/// Only the modes that make sense for a photographed label are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSegMode {
    /// Fully automatic page segmentation
    #[default]
    Auto = 3,
    /// Assume a single column of text
    SingleColumn = 4,
    /// Assume a single uniform block of text
    SingleBlock = 6,
    /// Find as much text as possible in no particular order
    SparseText = 11,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SparseText => "11",
        }
    }

    /// Parse the numeric Tesseract value (as used by `--psm`)
    pub fn from_number(value: u32) -> Option<Self> {
        match value {
            3 => Some(PageSegMode::Auto),
            4 => Some(PageSegMode::SingleColumn),
            6 => Some(PageSegMode::SingleBlock),
            11 => Some(PageSegMode::SparseText),
            _ => None,
        }
    }
}

/// Tesseract model type for different accuracy/speed trade-offs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ModelType {
    /// Fast model (tessdata_fast) - faster processing, lower accuracy
    #[default]
    Fast,
    /// Best model (tessdata_best) - slower processing, higher accuracy
    Best,
}

impl ModelType {
    /// Get the tessdata directory name for this model type
    pub fn tessdata_dir(&self) -> &'static str {
        match self {
            ModelType::Fast => "tessdata_fast",
            ModelType::Best => "tessdata_best",
        }
    }

    /// Parse a model name as found in the environment ("fast" / "best")
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fast" => Some(ModelType::Fast),
            "best" => Some(ModelType::Best),
            _ => None,
        }
    }
}

/// Configuration structure for label recognition
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// OCR language codes (e.g., "tha", "tha+eng")
    pub languages: String,
    /// Tesseract model type (Fast vs Best accuracy)
    pub model_type: ModelType,
    /// Maximum allowed image file size in bytes
    pub max_file_size: u64,
    /// Recovery and error handling configuration
    pub recovery: RecoveryConfig,
    /// Default page segmentation mode for OCR
    pub psm_mode: PageSegMode,
    /// Path to custom user words file for improved recognition
    pub user_words_file: Option<String>,
    /// Character whitelist; Thai labels need the full script so this is off by default
    pub character_whitelist: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.to_string(),
            model_type: ModelType::default(),
            max_file_size: MAX_FILE_SIZE,
            recovery: RecoveryConfig::default(),
            psm_mode: PageSegMode::default(),
            user_words_file: None,
            character_whitelist: None,
        }
    }
}

impl OcrConfig {
    /// Validate OCR configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.languages.trim().is_empty() {
            return Err(AppError::Config("languages cannot be empty".to_string()));
        }
        if self.languages.split('+').any(|lang| {
            lang.trim().is_empty() || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }) {
            return Err(AppError::Config(format!(
                "languages '{}' must be '+'-separated Tesseract codes",
                self.languages
            )));
        }
        if self.max_file_size == 0 {
            return Err(AppError::Config(
                "max_file_size must be greater than 0".to_string(),
            ));
        }

        if let Some(path) = &self.user_words_file {
            if !std::path::Path::new(path).is_file() {
                return Err(AppError::Config(format!(
                    "user words file '{}' does not exist",
                    path
                )));
            }
        }
        if matches!(&self.character_whitelist, Some(w) if w.trim().is_empty()) {
            return Err(AppError::Config(
                "character whitelist cannot be blank".to_string(),
            ));
        }

        self.recovery.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(unused_assignments)]
    fn test_recovery_config_validation() {
        let mut config = RecoveryConfig::default();

        assert!(config.validate().is_ok());

        // Zero retries is allowed: a single attempt
        config.max_retries = 0;
        assert!(config.validate().is_ok());

        config.base_retry_delay_ms = 0;
        assert!(config.validate().is_err());
        config.base_retry_delay_ms = 500;

        config.max_retry_delay_ms = 100;
        assert!(config.validate().is_err());
        config.max_retry_delay_ms = 5000;

        config.operation_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.operation_timeout_secs = 30;

        config.circuit_breaker_threshold = 0;
        assert!(config.validate().is_err());
        config.circuit_breaker_threshold = 5;

        config.circuit_breaker_reset_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_ocr_config_targets_thai() {
        let config = OcrConfig::default();
        assert_eq!(config.languages, "tha");
        assert_eq!(config.model_type, ModelType::Fast);
        assert_eq!(config.psm_mode, PageSegMode::Auto);
        assert!(config.character_whitelist.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ocr_config_rejects_bad_languages() {
        let mut config = OcrConfig {
            languages: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.languages = "tha+".to_string();
        assert!(config.validate().is_err());

        config.languages = "tha+eng".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ocr_config_checks_tuning_files() {
        let words = tempfile::NamedTempFile::new().unwrap();
        let mut config = OcrConfig {
            user_words_file: Some(words.path().display().to_string()),
            character_whitelist: Some("0123456789กขค".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.character_whitelist = Some("  ".to_string());
        assert!(config.validate().is_err());
        config.character_whitelist = None;

        config.user_words_file = Some("/definitely/not/here.words".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_page_seg_mode_round_trip_numbers() {
        assert_eq!(PageSegMode::from_number(6), Some(PageSegMode::SingleBlock));
        assert_eq!(PageSegMode::from_number(6).map(|m| m.as_str()), Some("6"));
        assert_eq!(PageSegMode::from_number(99), None);
    }

    #[test]
    fn test_model_type_parse() {
        assert_eq!(ModelType::parse("BEST"), Some(ModelType::Best));
        assert_eq!(ModelType::parse(" fast "), Some(ModelType::Fast));
        assert_eq!(ModelType::parse("medium"), None);
        assert_eq!(ModelType::Best.tessdata_dir(), "tessdata_best");
    }
}
