//! # Tummy Scan
//!
//! Nutrition label extraction for a personal food log: a photo of a label is
//! preprocessed, recognized with OCR, translated line by line and parsed into
//! structured nutrition fields that pre-fill the entry form.

pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod instance_manager;
pub mod nutrition_form;
pub mod nutrition_parser;
pub mod observability;
pub mod observability_config;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod pipeline;
pub mod preprocessing;
pub mod progress;
pub mod translation;

// Re-export types for easier access
pub use nutrition_form::{BarcodeFormat, FoodItemDraft, FormErrors, NutritionForm};
pub use nutrition_parser::{parse_nutrition_text, NutritionMatch, NutritionParser, TermDictionary};
pub use pipeline::{ScanError, ScanOutcome, ScanPipeline};
pub use preprocessing::{Frame, PixelLayout};
pub use progress::{ProgressEvent, ProgressReporter, ScanStage};
