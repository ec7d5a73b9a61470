//! # OCR Processing Module
//!
//! Text recognition for nutrition label photos.
//!
//! The engine sits behind the [`TextRecognizer`] trait so the pipeline can be
//! driven by Tesseract in production and by scripted recognizers in tests.
//! [`recognize_with_recovery`] wraps any recognizer with the protection a
//! long-running engine call needs:
//!
//! ```text
//! circuit breaker open? ── yes ──► Unavailable
//!        │ no
//!        ▼
//! attempt (with timeout) ── ok ──► record success, return text
//!        │ err
//!        ▼
//! retryable and attempts left? ── yes ──► sleep(backoff + jitter), retry
//!        │ no
//!        ▼
//! record failure, return last error
//! ```

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::errors::error_logging;
use crate::instance_manager::OcrInstanceManager;
use crate::observability;
use crate::ocr_config::{OcrConfig, RecoveryConfig};
use crate::ocr_errors::OcrError;
use crate::progress::ProgressReporter;

/// Raw recognized text plus engine metadata
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    /// Cleaned text, one recognized line per line
    pub text: String,
    /// Language codes the engine ran with
    pub languages: String,
    /// Mean word confidence reported by the engine (0-100), when available
    pub confidence: Option<f32>,
    /// Wall time of the successful attempt
    pub duration: Duration,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

/// An OCR engine that turns an encoded still image into text
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text in `image` (any encoding the engine accepts, PNG in the pipeline).
    ///
    /// Progress is published through `progress` while the call runs.
    async fn recognize(
        &self,
        image: &[u8],
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, OcrError>;
}

lazy_static! {
    // Tesseract's Thai model tends to emit spaces between glyph clusters.
    static ref THAI_GAP: Regex =
        Regex::new(r"(\p{Thai})[ \t]+(\p{Thai})").expect("THAI_GAP is a valid regex");
}

/// Join Thai glyph runs that the engine split with spaces.
///
/// Thai script does not separate words with spaces, so a space between two
/// Thai characters is recognition noise that would otherwise break term
/// matching (`พ ลังงาน` vs `พลังงาน`).
pub fn collapse_thai_spacing(text: &str) -> String {
    let mut current = text.to_string();
    // Each pass can only join non-overlapping pairs, so repeat until stable.
    loop {
        let next = THAI_GAP.replace_all(&current, "$1$2").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Trim every line and drop the empty ones
pub fn clean_recognized_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Tesseract-backed recognizer using pooled engine instances
pub struct TesseractRecognizer {
    config: OcrConfig,
    instances: Arc<OcrInstanceManager>,
}

impl TesseractRecognizer {
    pub fn new(config: OcrConfig, instances: Arc<OcrInstanceManager>) -> Self {
        Self { config, instances }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(
        &self,
        image: &[u8],
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, OcrError> {
        let start_time = Instant::now();
        progress.report("initializing tesseract", 0.0);

        let config = self.config.clone();
        let instances = Arc::clone(&self.instances);
        let image = image.to_vec();
        let span = observability::ocr_span("tesseract_recognize");

        // The engine call is CPU bound and synchronous; keep it off the async workers.
        // The closure owns no progress sender, so a call abandoned after a timeout
        // cannot hold the progress channel open.
        let engine_task = tokio::task::spawn_blocking(move || {
            let _span = span.entered();
            let instance = instances
                .get_idle_instance(&config)
                .map_err(|e| OcrError::Initialization(e.to_string()))?;
            let mut tess = instance.lock();

            tess.set_image_from_mem(&image).map_err(|e| {
                OcrError::ImageLoad(format!("Failed to load image for OCR: {e}"))
            })?;
            let text = tess.get_utf8_text().map_err(|e| {
                OcrError::Extraction(format!("Failed to extract text from image: {e}"))
            })?;
            let confidence = tess.mean_text_conf();

            Ok::<_, OcrError>((text, confidence))
        });
        progress.report("loading image", 0.1);
        progress.report("recognizing text", 0.2);

        let (raw_text, confidence) = engine_task
            .await
            .map_err(|e| OcrError::Extraction(format!("OCR worker task failed: {e}")))??;
        progress.report("recognizing text", 1.0);

        let text = collapse_thai_spacing(&clean_recognized_text(&raw_text));
        if text.is_empty() {
            return Err(OcrError::EmptyResult);
        }

        let duration = start_time.elapsed();
        info!(
            duration_ms = duration.as_millis() as u64,
            characters = text.chars().count(),
            confidence,
            "OCR processing completed"
        );

        Ok(RecognitionResult {
            text,
            languages: self.config.languages.clone(),
            // Tesseract reports a negative value when it has nothing to score.
            confidence: (confidence >= 0).then_some(confidence as f32),
            duration,
            attempts: 1,
        })
    }
}

/// Calculate retry delay with exponential backoff
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay)
/// final = delay + random(0..=delay/4)
/// ```
///
/// `attempt` is 1-based (first retry = 1).
pub fn calculate_retry_delay(attempt: u32, recovery: &RecoveryConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(32);
    let delay = recovery
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(recovery.max_retry_delay_ms);

    let jitter = rand::random::<u64>() % (delay / 4 + 1);
    delay + jitter
}

/// Run one recognition with timeout, retries and circuit breaker protection.
///
/// # Errors
///
/// - `Unavailable` when the circuit breaker is open,
/// - `Timeout` when an attempt exceeds `operation_timeout_secs` (not retried:
///   the engine call is still running and a retry would queue behind it),
/// - otherwise the recognizer's error from the last attempt.
pub async fn recognize_with_recovery(
    recognizer: &dyn TextRecognizer,
    image: &[u8],
    config: &OcrConfig,
    circuit_breaker: &CircuitBreaker,
    progress: &ProgressReporter,
) -> Result<RecognitionResult, OcrError> {
    let start_time = Instant::now();

    if circuit_breaker.is_open() {
        warn!("Circuit breaker is open, rejecting OCR request");
        observability::update_circuit_breaker_state(true);
        let err = OcrError::Unavailable("OCR failed repeatedly; try again in a moment".to_string());
        observability::record_ocr_error(err.kind());
        return Err(err);
    }
    observability::update_circuit_breaker_state(false);

    let timeout = Duration::from_secs(config.recovery.operation_timeout_secs);
    let max_attempts = config.recovery.max_retries + 1;
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = match tokio::time::timeout(timeout, recognizer.recognize(image, progress))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(OcrError::Timeout(format!(
                "OCR operation timed out after {} seconds",
                config.recovery.operation_timeout_secs
            ))),
        };

        match outcome {
            Ok(mut result) => {
                circuit_breaker.record_success();
                observability::update_circuit_breaker_state(false);
                observability::record_ocr_metrics(true, start_time.elapsed(), attempt);

                result.attempts = attempt;
                info!(
                    attempt,
                    total_ms = start_time.elapsed().as_millis() as u64,
                    "OCR extraction completed successfully"
                );
                return Ok(result);
            }
            Err(err) if attempt >= max_attempts || !err.is_retryable() => {
                circuit_breaker.record_failure();
                observability::update_circuit_breaker_state(circuit_breaker.is_open());
                observability::record_ocr_metrics(false, start_time.elapsed(), attempt);
                observability::record_ocr_error(err.kind());

                error_logging::log_ocr_error(
                    &err,
                    "recognize_with_recovery",
                    Some(image.len() as u64),
                    Some(attempt),
                    Some(start_time.elapsed()),
                );
                return Err(err);
            }
            Err(err) => {
                let delay_ms = calculate_retry_delay(attempt, &config.recovery);
                warn!(attempt, error = %err, delay_ms, "OCR attempt failed, retrying");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                debug!(attempt = attempt + 1, "Retrying OCR");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_thai_spacing_joins_split_words() {
        assert_eq!(collapse_thai_spacing("พ ลั ง ง า น 250"), "พลังงาน 250");
        assert_eq!(collapse_thai_spacing("โปรตีน 5 ก."), "โปรตีน 5 ก.");
        assert_eq!(collapse_thai_spacing("Super Snack"), "Super Snack");
    }

    #[test]
    fn test_clean_recognized_text() {
        assert_eq!(
            clean_recognized_text("  line one \n\n   \nline two\n"),
            "line one\nline two"
        );
        assert_eq!(clean_recognized_text(" \n "), "");
    }

    #[test]
    fn test_retry_delay_grows_and_caps() {
        let config = RecoveryConfig {
            base_retry_delay_ms: 1000,
            max_retry_delay_ms: 5000,
            ..Default::default()
        };
        let first = calculate_retry_delay(1, &config);
        assert!((1000..=1250).contains(&first));
        let second = calculate_retry_delay(2, &config);
        assert!((2000..=2500).contains(&second));
        let capped = calculate_retry_delay(10, &config);
        assert!((5000..=6250).contains(&capped));
    }

    #[test]
    fn test_retry_delay_handles_tiny_base() {
        let config = RecoveryConfig {
            base_retry_delay_ms: 1,
            max_retry_delay_ms: 1,
            ..Default::default()
        };
        assert!(calculate_retry_delay(1, &config) <= 1);
    }
}
