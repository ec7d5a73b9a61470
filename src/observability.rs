//! Observability module: structured logging setup, span helpers and metric
//! recording for the scan pipeline.
//!
//! Metrics go through the `metrics` facade only. Without an installed
//! recorder they are no-ops, so library users decide whether to export them.

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::observability_config::ObservabilityConfig;

/// Initialize structured logging with tracing and configuration
///
/// Pretty output in development or when `LOG_FORMAT=pretty`, JSON otherwise.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("tummy_scan={}", config.log_level).parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    if config.use_pretty_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Span covering one scan attempt
pub fn scan_span(source: &str) -> tracing::Span {
    tracing::info_span!("scan", source = source, component = "pipeline")
}

/// Span covering one pipeline stage
pub fn stage_span(stage: crate::progress::ScanStage) -> tracing::Span {
    tracing::info_span!("scan_stage", stage = %stage, component = "pipeline")
}

/// Create a span for OCR operations
pub fn ocr_span(operation: &str) -> tracing::Span {
    tracing::info_span!("ocr_operation", operation = operation, component = "ocr")
}

/// Record one finished recognition (after retries)
pub fn record_ocr_metrics(success: bool, duration: std::time::Duration, attempts: u32) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("ocr_operations_total", "result" => result).increment(1);
    metrics::histogram!("ocr_duration_seconds").record(duration.as_secs_f64());
    metrics::histogram!("ocr_attempts").record(f64::from(attempts));
}

/// Count a recognition failure by error kind
pub fn record_ocr_error(kind: &'static str) {
    metrics::counter!("ocr_errors_total", "kind" => kind).increment(1);
}

/// Record the outcome of one line translation
pub fn record_translation_line(translated: bool) {
    let result = if translated { "translated" } else { "fallback" };
    metrics::counter!("translation_lines_total", "result" => result).increment(1);
}

/// Record how many fields the extractor populated
pub fn record_extraction(fields_found: usize) {
    metrics::histogram!("nutrition_fields_extracted").record(fields_found as f64);
}

/// Record the final result of a scan attempt
pub fn record_scan_outcome(result: &'static str, duration: std::time::Duration) {
    metrics::counter!("scan_outcomes_total", "result" => result).increment(1);
    metrics::histogram!("scan_duration_seconds").record(duration.as_secs_f64());
}

/// Update circuit breaker state metric
pub fn update_circuit_breaker_state(is_open: bool) {
    metrics::gauge!("circuit_breaker_state").set(if is_open { 1.0 } else { 0.0 });
}
