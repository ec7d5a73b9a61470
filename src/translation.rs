//! # Translation Module
//!
//! Translates recognized label text into the working language line by line.
//!
//! Lines are independent, so they are translated concurrently (bounded by
//! `max_concurrent_requests`) and gathered back in their original order. A
//! line that cannot be translated keeps its original text; the batch as a
//! whole never fails.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;
use crate::progress::ProgressReporter;

pub const DEFAULT_GOOGLE_ENDPOINT: &str = "https://translate.googleapis.com";

/// Errors from a single line translation
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// The request could not be sent or the connection failed
    Request(String),
    /// The endpoint answered with a non-success status
    Status { status: u16, body: String },
    /// The response body did not have the expected shape
    MalformedResponse(String),
    /// The endpoint answered with an empty translation
    EmptyTranslation,
    /// No answer within the per-line timeout
    Timeout(u64),
}

impl std::fmt::Display for TranslationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslationError::Request(msg) => write!(f, "Translation request failed: {}", msg),
            TranslationError::Status { status, body } => {
                write!(f, "Translation endpoint returned {}: {}", status, body)
            }
            TranslationError::MalformedResponse(msg) => {
                write!(f, "Malformed translation response: {}", msg)
            }
            TranslationError::EmptyTranslation => write!(f, "Translation came back empty"),
            TranslationError::Timeout(secs) => {
                write!(f, "Translation timed out after {} seconds", secs)
            }
        }
    }
}

impl std::error::Error for TranslationError {}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        TranslationError::Request(err.to_string())
    }
}

/// Which translation service backs the translator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationBackend {
    /// Public Google translate endpoint
    #[default]
    Google,
    /// JSON proxy: `POST {"text"}` answered with `{"translatedText"}`
    Proxy,
    /// Pass text through untranslated
    None,
}

impl TranslationBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "google" => Some(TranslationBackend::Google),
            "proxy" => Some(TranslationBackend::Proxy),
            "none" | "off" => Some(TranslationBackend::None),
            _ => None,
        }
    }
}

/// Translation settings
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub backend: TranslationBackend,
    /// Base URL (Google) or full URL (proxy) of the service
    pub endpoint: Option<String>,
    pub source_lang: String,
    pub target_lang: String,
    /// Upper bound on lines in flight at once
    pub max_concurrent_requests: usize,
    /// Budget for one line, including retries inside the HTTP client
    pub line_timeout_secs: u64,
    /// HTTP client request timeout
    pub request_timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            backend: TranslationBackend::default(),
            endpoint: None,
            source_lang: "th".to_string(),
            target_lang: "en".to_string(),
            max_concurrent_requests: 8,
            line_timeout_secs: 10,
            request_timeout_secs: 10,
        }
    }
}

impl TranslationConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.source_lang.trim().is_empty() || self.target_lang.trim().is_empty() {
            return Err(AppError::Config(
                "translation source and target languages cannot be empty".to_string(),
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(AppError::Config(
                "max_concurrent_requests must be greater than 0".to_string(),
            ));
        }
        if self.line_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "translation timeouts must be greater than 0".to_string(),
            ));
        }
        if self.backend == TranslationBackend::Proxy && self.endpoint.is_none() {
            return Err(AppError::Config(
                "TRANSLATION_ENDPOINT is required for the proxy backend".to_string(),
            ));
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(AppError::Config(format!(
                    "translation endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }
        Ok(())
    }
}

/// A service able to translate one line of text
#[async_trait]
pub trait LineTranslator: Send + Sync {
    async fn translate_line(
        &self,
        line: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError>;
}

/// Client for the public Google translate endpoint
pub struct GoogleTranslator {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslator {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Concatenate the translated segments of a Google `translate_a/single` answer.
///
/// The answer is a nested array whose first element lists
/// `[translated, original, ...]` segments, one per sentence.
pub fn parse_google_response(body: &serde_json::Value) -> Result<String, TranslationError> {
    let segments = body
        .get(0)
        .and_then(|s| s.as_array())
        .ok_or_else(|| TranslationError::MalformedResponse("missing segment list".to_string()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
        .collect();

    Ok(text)
}

#[async_trait]
impl LineTranslator for GoogleTranslator {
    async fn translate_line(
        &self,
        line: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let url = format!("{}/translate_a/single", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", line),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranslationError::MalformedResponse(e.to_string()))?;
        parse_google_response(&body)
    }
}

#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyResponse {
    translated_text: Option<String>,
}

/// Client for a translation proxy speaking `{text}` → `{translatedText}`
pub struct ProxyTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl ProxyTranslator {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl LineTranslator for ProxyTranslator {
    // The proxy fixes the language pair on its side.
    async fn translate_line(
        &self,
        line: &str,
        _source: &str,
        _target: &str,
    ) -> Result<String, TranslationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ProxyRequest { text: line })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ProxyResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::MalformedResponse(e.to_string()))?;
        body.translated_text.ok_or_else(|| {
            TranslationError::MalformedResponse("missing translatedText".to_string())
        })
    }
}

/// Line-wise translator with bounded concurrency and per-line fallback
pub struct Translator {
    backend: Option<Arc<dyn LineTranslator>>,
    config: TranslationConfig,
}

impl Translator {
    /// Build the translator for the configured backend
    pub fn from_config(config: TranslationConfig) -> AppResult<Self> {
        let backend: Option<Arc<dyn LineTranslator>> = match config.backend {
            TranslationBackend::None => None,
            TranslationBackend::Google | TranslationBackend::Proxy => {
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.request_timeout_secs))
                    .build()
                    .map_err(|e| {
                        AppError::Internal(format!("Failed to build HTTP client: {}", e))
                    })?;

                if config.backend == TranslationBackend::Google {
                    let base = config
                        .endpoint
                        .clone()
                        .unwrap_or_else(|| DEFAULT_GOOGLE_ENDPOINT.to_string());
                    Some(Arc::new(GoogleTranslator::new(client, base)))
                } else {
                    let endpoint = config.endpoint.clone().ok_or_else(|| {
                        AppError::Config(
                            "TRANSLATION_ENDPOINT is required for the proxy backend".to_string(),
                        )
                    })?;
                    Some(Arc::new(ProxyTranslator::new(client, endpoint)))
                }
            }
        };

        Ok(Self { backend, config })
    }

    /// Use a specific line translator
    pub fn with_backend(backend: Arc<dyn LineTranslator>, config: TranslationConfig) -> Self {
        Self {
            backend: Some(backend),
            config,
        }
    }

    /// A translator that returns its input lines unchanged
    pub fn passthrough() -> Self {
        Self {
            backend: None,
            config: TranslationConfig {
                backend: TranslationBackend::None,
                ..Default::default()
            },
        }
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    /// Translate every non-blank line of `text` and rejoin them with `\n`.
    ///
    /// The result has one line per non-blank input line, in input order.
    /// Failed lines keep their original text.
    pub async fn translate_text(&self, text: &str, progress: &ProgressReporter) -> String {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let total = lines.len();

        let backend = match &self.backend {
            Some(backend) if self.config.source_lang != self.config.target_lang => backend,
            _ => {
                debug!(lines = total, "Translation skipped, returning lines unchanged");
                return lines.join("\n");
            }
        };

        info!(
            lines = total,
            source = %self.config.source_lang,
            target = %self.config.target_lang,
            "Translating recognized text"
        );
        progress.report(format!("translating {} lines", total), 0.0);

        let timeout_secs = self.config.line_timeout_secs;
        let source = self.config.source_lang.as_str();
        let target = self.config.target_lang.as_str();

        let translated: Vec<String> = stream::iter(lines.into_iter().enumerate())
            .map(|(index, line)| {
                let backend = Arc::clone(backend);
                async move {
                    let attempt = tokio::time::timeout(
                        Duration::from_secs(timeout_secs),
                        backend.translate_line(line.trim(), source, target),
                    )
                    .await
                    .unwrap_or(Err(TranslationError::Timeout(timeout_secs)));

                    match attempt.and_then(normalize_translation) {
                        Ok(text) => {
                            observability::record_translation_line(true);
                            text
                        }
                        Err(err) => {
                            observability::record_translation_line(false);
                            error_logging::log_network_error(
                                &err,
                                "translate_line",
                                None,
                                Some(index),
                            );
                            line.to_string()
                        }
                    }
                }
            })
            .buffered(self.config.max_concurrent_requests)
            .collect()
            .await;

        progress.report("translation complete", 1.0);
        translated.join("\n")
    }
}

/// Reject blank translations and keep each translation on one line
fn normalize_translation(text: String) -> Result<String, TranslationError> {
    let folded = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if folded.is_empty() {
        warn!("Translation service returned blank text");
        return Err(TranslationError::EmptyTranslation);
    }
    Ok(folded)
}
