//! # Application Error Types
//!
//! This module defines common error types used throughout the scan pipeline.
//! Stage-specific errors (`OcrError`, `ScanError`, `PreprocessingError`) convert
//! into `AppError` so callers outside the pipeline can handle one type.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors (form fields, barcodes, inputs)
    Validation(String),
    /// Camera/image capture errors
    Capture(String),
    /// OCR processing errors
    Ocr(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Capture(msg) => write!(f, "[CAPTURE] {}", msg),
            AppError::Ocr(msg) => write!(f, "[OCR] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::ocr_errors::OcrError> for AppError {
    fn from(err: crate::ocr_errors::OcrError) -> Self {
        AppError::Ocr(err.to_string())
    }
}

impl From<crate::preprocessing::PreprocessingError> for AppError {
    fn from(err: crate::preprocessing::PreprocessingError) -> Self {
        AppError::Capture(err.to_string())
    }
}

impl From<crate::pipeline::ScanError> for AppError {
    fn from(err: crate::pipeline::ScanError) -> Self {
        match err {
            crate::pipeline::ScanError::Capture(msg) => AppError::Capture(msg),
            crate::pipeline::ScanError::Ocr(e) => AppError::Ocr(e.to_string()),
        }
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the pipeline
pub mod error_logging {
    use tracing::{error, warn};

    /// Log OCR processing errors with image and processing context
    pub fn log_ocr_error(
        error: &impl std::fmt::Display,
        operation: &str,
        image_size: Option<u64>,
        attempt_count: Option<u32>,
        processing_duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            image_size_bytes = ?image_size,
            attempt_count = ?attempt_count,
            processing_duration_ms = ?processing_duration.map(|d| d.as_millis()),
            "OCR processing failed"
        );
    }

    /// Log capture errors (unreadable files, malformed frames)
    pub fn log_capture_error(
        error: &impl std::fmt::Display,
        operation: &str,
        path: Option<&str>,
        dimensions: Option<(u32, u32)>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            path = ?path,
            dimensions = ?dimensions,
            "Image capture failed"
        );
    }

    /// Log network/communication errors with connection context.
    ///
    /// Logged at warn level: every network failure in the pipeline is absorbed
    /// by a fallback, so none of them is fatal on its own.
    pub fn log_network_error(
        error: &impl std::fmt::Display,
        operation: &str,
        endpoint: Option<&str>,
        line_index: Option<usize>,
    ) {
        warn!(
            error = %error,
            operation = %operation,
            endpoint = ?endpoint,
            line_index = ?line_index,
            "Network operation failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}
