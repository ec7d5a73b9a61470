//! # Test Helper Library
//!
//! Scripted recognizers and translators so integration tests can drive the
//! pipeline without Tesseract or network access.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tummy_scan::ocr::{RecognitionResult, TextRecognizer};
use tummy_scan::ocr_config::{OcrConfig, RecoveryConfig};
use tummy_scan::ocr_errors::OcrError;
use tummy_scan::preprocessing::{Frame, PixelLayout};
use tummy_scan::progress::ProgressReporter;
use tummy_scan::translation::{LineTranslator, TranslationError};

pub const SUPER_SNACK_LABEL: &str = "SuperSnack\nพลังงาน 250 กิโลแคลอรี่\nโปรตีน 5 ก.";

/// Recognizer that replays a fixed list of outcomes, one per call.
/// Once the script runs out the last outcome repeats.
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Result<String, OcrError>>>,
    last: Mutex<Option<Result<String, OcrError>>>,
    delay: Duration,
    calls: AtomicU32,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<Result<String, OcrError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn always(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn failing(error: OcrError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for ScriptedRecognizer {
    async fn recognize(
        &self,
        _image: &[u8],
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        progress.report("recognizing text", 0.2);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = {
            let mut script = self.script.lock();
            let mut last = self.last.lock();
            match script.pop_front() {
                Some(outcome) => {
                    *last = Some(outcome.clone());
                    outcome
                }
                None => last.clone().unwrap_or(Err(OcrError::EmptyResult)),
            }
        };

        progress.report("recognizing text", 1.0);
        next.map(|text| RecognitionResult {
            text,
            languages: "tha".to_string(),
            confidence: Some(87.0),
            duration: Duration::from_millis(5),
            attempts: 1,
        })
    }
}

/// Translator backed by a lookup table; unknown lines fail
pub struct TableTranslator {
    table: HashMap<String, String>,
    /// Lines earlier in the input wait longer, so completion order is reversed
    stagger: bool,
    calls: AtomicU32,
}

impl TableTranslator {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            table: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            stagger: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn staggered(mut self) -> Self {
        self.stagger = true;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LineTranslator for TableTranslator {
    async fn translate_line(
        &self,
        line: &str,
        _source: &str,
        _target: &str,
    ) -> Result<String, TranslationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stagger {
            let wait = 40u64.saturating_sub(u64::from(call) * 10);
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        self.table
            .get(line)
            .cloned()
            .ok_or_else(|| TranslationError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
    }
}

/// Translator whose every call fails
pub struct DownTranslator;

#[async_trait]
impl LineTranslator for DownTranslator {
    async fn translate_line(
        &self,
        _line: &str,
        _source: &str,
        _target: &str,
    ) -> Result<String, TranslationError> {
        Err(TranslationError::Request("connection refused".to_string()))
    }
}

/// OCR config with millisecond backoff so retry tests stay fast
pub fn fast_ocr_config(max_retries: u32) -> OcrConfig {
    OcrConfig {
        recovery: RecoveryConfig {
            max_retries,
            base_retry_delay_ms: 1,
            max_retry_delay_ms: 2,
            operation_timeout_secs: 1,
            circuit_breaker_threshold: 3,
            circuit_breaker_reset_secs: 60,
        },
        ..Default::default()
    }
}

/// Small RGB frame with a colour gradient
pub fn sample_frame() -> Frame {
    let (width, height) = (8u32, 6u32);
    let pixels = (0..width * height)
        .flat_map(|i| {
            let v = (i * 5) as u8;
            [v, 255 - v, v / 2]
        })
        .collect();
    Frame::new(width, height, PixelLayout::Rgb, pixels).expect("valid test frame")
}
