//! # OCR Error Types Module
//!
//! This module defines the error type returned by text recognition.
//! Every variant is fatal to the current scan attempt; the caller offers a retry.

/// Custom error types for OCR operations
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// OCR engine initialization errors
    Initialization(String),
    /// Image loading errors
    ImageLoad(String),
    /// Text extraction errors
    Extraction(String),
    /// The engine ran but produced no usable text
    EmptyResult,
    /// Timeout errors
    Timeout(String),
    /// Circuit breaker is open after repeated failures
    Unavailable(String),
}

impl OcrError {
    /// Short machine-readable label, used as a metrics/log field
    pub fn kind(&self) -> &'static str {
        match self {
            OcrError::Initialization(_) => "initialization",
            OcrError::ImageLoad(_) => "image_load",
            OcrError::Extraction(_) => "extraction",
            OcrError::EmptyResult => "empty_result",
            OcrError::Timeout(_) => "timeout",
            OcrError::Unavailable(_) => "unavailable",
        }
    }

    /// Whether another attempt can help.
    ///
    /// A timed-out engine call keeps running on the blocking pool, so a retry
    /// would only queue behind it; an open circuit stays open for the reset window.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, OcrError::Timeout(_) | OcrError::Unavailable(_))
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Initialization(msg) => {
                write!(f, "[OCR_INIT] OCR engine initialization failed: {}", msg)
            }
            OcrError::ImageLoad(msg) => {
                write!(f, "[IMAGE_LOAD] Failed to load image for OCR processing: {}", msg)
            }
            OcrError::Extraction(msg) => {
                write!(f, "[OCR_EXTRACT] Text extraction from image failed: {}", msg)
            }
            OcrError::EmptyResult => {
                write!(f, "[OCR_EMPTY] OCR engine returned no usable text")
            }
            OcrError::Timeout(msg) => write!(f, "[OCR_TIMEOUT] OCR processing timed out: {}", msg),
            OcrError::Unavailable(msg) => {
                write!(f, "[OCR_UNAVAILABLE] OCR service unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for OcrError {}
