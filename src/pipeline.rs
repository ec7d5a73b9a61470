//! # Scan Pipeline
//!
//! Sequences one label scan: preprocess → recognize → translate → extract.
//!
//! Only capture and recognition can fail a scan. Translation problems degrade
//! to the original text and extraction gaps leave fields unset.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Instrument};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::AppConfig;
use crate::errors::{error_logging, AppResult};
use crate::instance_manager::OcrInstanceManager;
use crate::nutrition_parser::{NutritionMatch, NutritionParser};
use crate::observability;
use crate::ocr::{recognize_with_recovery, TesseractRecognizer, TextRecognizer};
use crate::ocr_config::OcrConfig;
use crate::ocr_errors::OcrError;
use crate::preprocessing::{self, Frame, PreprocessingError};
use crate::progress::{ProgressReporter, ScanStage};
use crate::translation::Translator;

/// Message shown to the user whenever a scan has to be retried
pub const SCAN_FAILED_MESSAGE: &str = "Failed to process image. Please try again.";

/// Everything produced by one successful scan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub raw_text: String,
    pub translated_text: String,
    pub parsed: NutritionMatch,
    pub scanned_at: DateTime<Utc>,
}

/// Reasons a scan is abandoned
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// The frame or image file could not be turned into an OCR input
    Capture(String),
    /// Recognition failed after recovery
    Ocr(OcrError),
}

impl ScanError {
    pub fn stage(&self) -> ScanStage {
        match self {
            ScanError::Capture(_) => ScanStage::Preprocessing,
            ScanError::Ocr(_) => ScanStage::Recognition,
        }
    }

    /// Both failures are transient from the user's point of view: take another photo
    pub fn is_retryable(&self) -> bool {
        true
    }

    pub fn user_message(&self) -> &'static str {
        SCAN_FAILED_MESSAGE
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::Capture(msg) => write!(f, "Capture failed: {}", msg),
            ScanError::Ocr(err) => write!(f, "Recognition failed: {}", err),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<PreprocessingError> for ScanError {
    fn from(err: PreprocessingError) -> Self {
        ScanError::Capture(err.to_string())
    }
}

impl From<OcrError> for ScanError {
    fn from(err: OcrError) -> Self {
        ScanError::Ocr(err)
    }
}

/// Owns the collaborators of a scan and runs scans against them
pub struct ScanPipeline {
    recognizer: Arc<dyn TextRecognizer>,
    translator: Translator,
    parser: NutritionParser,
    ocr_config: OcrConfig,
    circuit_breaker: CircuitBreaker,
}

impl ScanPipeline {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        translator: Translator,
        parser: NutritionParser,
        ocr_config: OcrConfig,
    ) -> Self {
        let circuit_breaker = CircuitBreaker::new(&ocr_config.recovery);
        Self {
            recognizer,
            translator,
            parser,
            ocr_config,
            circuit_breaker,
        }
    }

    /// Production pipeline: Tesseract, the configured translation backend and dictionary
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let recognizer = TesseractRecognizer::new(
            config.ocr.clone(),
            Arc::new(OcrInstanceManager::new()),
        );
        let translator = Translator::from_config(config.translation.clone())?;
        let parser = NutritionParser::from_config(&config.parser)?;
        Ok(Self::new(
            Arc::new(recognizer),
            translator,
            parser,
            config.ocr.clone(),
        ))
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Run one scan over a captured frame
    pub async fn scan(
        &self,
        frame: Frame,
        progress: ProgressReporter,
    ) -> Result<ScanOutcome, ScanError> {
        let span = observability::scan_span("frame");
        let start_time = Instant::now();

        let result = self.run_stages(frame, &progress).instrument(span).await;

        let label = match &result {
            Ok(_) => "success",
            Err(ScanError::Capture(_)) => "capture_failure",
            Err(ScanError::Ocr(_)) => "ocr_failure",
        };
        observability::record_scan_outcome(label, start_time.elapsed());
        result
    }

    /// Load an image file and scan it
    pub async fn scan_image_file(
        &self,
        path: impl AsRef<Path>,
        progress: ProgressReporter,
    ) -> Result<ScanOutcome, ScanError> {
        let path = path.as_ref();
        let frame = match preprocessing::load_frame_from_file(path, self.ocr_config.max_file_size)
        {
            Ok(frame) => frame,
            Err(err) => {
                error_logging::log_capture_error(
                    &err,
                    "scan_image_file",
                    path.to_str(),
                    None,
                );
                observability::record_scan_outcome("capture_failure", std::time::Duration::ZERO);
                return Err(err.into());
            }
        };
        info!(
            path = %path.display(),
            dimensions = ?frame.dimensions(),
            "Loaded image for scanning"
        );
        self.scan(frame, progress).await
    }

    async fn run_stages(
        &self,
        mut frame: Frame,
        progress: &ProgressReporter,
    ) -> Result<ScanOutcome, ScanError> {
        let encoded = {
            let _stage = observability::stage_span(ScanStage::Preprocessing).entered();
            let reporter = progress.for_stage(ScanStage::Preprocessing);
            reporter.report("preprocessing image", 0.0);
            preprocessing::preprocess_frame(&mut frame);
            let encoded = frame.encode_png().map_err(|err| {
                error_logging::log_capture_error(
                    &err,
                    "encode_png",
                    None,
                    Some(frame.dimensions()),
                );
                ScanError::from(err)
            })?;
            reporter.report("preprocessing image", 1.0);
            encoded
        };

        let recognition = recognize_with_recovery(
            self.recognizer.as_ref(),
            &encoded,
            &self.ocr_config,
            &self.circuit_breaker,
            &progress.for_stage(ScanStage::Recognition),
        )
        .instrument(observability::stage_span(ScanStage::Recognition))
        .await?;

        let translated_text = self
            .translator
            .translate_text(
                &recognition.text,
                &progress.for_stage(ScanStage::Translation),
            )
            .instrument(observability::stage_span(ScanStage::Translation))
            .await;

        let parsed = {
            let _stage = observability::stage_span(ScanStage::Extraction).entered();
            let reporter = progress.for_stage(ScanStage::Extraction);
            reporter.report("extracting nutrition fields", 0.0);
            let parsed = self.parser.parse(&translated_text);
            reporter.report("extracting nutrition fields", 1.0);
            parsed
        };

        info!(
            attempts = recognition.attempts,
            confidence = ?recognition.confidence,
            fields_found = parsed.fields_found(),
            "Scan completed"
        );

        Ok(ScanOutcome {
            raw_text: recognition.text,
            translated_text,
            parsed,
            scanned_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_stage_and_message() {
        let capture = ScanError::Capture("bad frame".to_string());
        assert_eq!(capture.stage(), ScanStage::Preprocessing);
        assert_eq!(capture.user_message(), SCAN_FAILED_MESSAGE);

        let ocr = ScanError::from(OcrError::EmptyResult);
        assert_eq!(ocr.stage(), ScanStage::Recognition);
        assert!(ocr.is_retryable());
    }

    #[test]
    fn test_preprocessing_error_becomes_capture() {
        let err: ScanError = PreprocessingError::InvalidDimensions {
            width: 0,
            height: 0,
        }
        .into();
        assert!(matches!(err, ScanError::Capture(_)));
    }
}
