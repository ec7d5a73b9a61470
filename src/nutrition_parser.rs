//! # Nutrition Field Extraction
//!
//! Turns (translated) label text into a [`NutritionMatch`] by matching lines
//! against a term dictionary.
//!
//! ## Rules
//!
//! - A term matches anywhere in a line, or only at its start when written
//!   with a leading `^` (`^fat` matches `Fat 3 g` but not `Low Fat Crackers`).
//! - The product name is the first of the leading lines that matches no
//!   dictionary term at all.
//! - For every field, the first line containing any of its terms wins. This
//!   means a line such as `Calories from fat 90` is taken for calories when it
//!   comes first; that is a known source of misparses and is kept on purpose
//!   so results stay predictable.
//! - Free-text fields take whatever follows the last `:` on the line.
//! - Numeric fields take the first decimal number on the line.
//!
//! Nothing is ever defaulted: a field that is not found stays `None`.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::observability;

lazy_static! {
    // ASCII digits only: OCR output can carry Thai digits, which f64 parsing rejects.
    static ref NUMBER: Regex =
        Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("NUMBER is a valid regex");
    static ref DEFAULT_PARSER: NutritionParser = NutritionParser::default();
}

/// Leading lines considered when looking for the product name
pub const DEFAULT_NAME_SCAN_LINES: usize = 5;

/// Label fields the extractor knows how to find
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NutritionField {
    ServingSize,
    ServingsPerContainer,
    Calories,
    Protein,
    Carbohydrates,
    Sugar,
    Fiber,
    Fat,
    Sodium,
}

impl NutritionField {
    pub const ALL: [NutritionField; 9] = [
        NutritionField::ServingSize,
        NutritionField::ServingsPerContainer,
        NutritionField::Calories,
        NutritionField::Protein,
        NutritionField::Carbohydrates,
        NutritionField::Sugar,
        NutritionField::Fiber,
        NutritionField::Fat,
        NutritionField::Sodium,
    ];

    /// Serving fields are kept as text ("1 ซอง (30 ก.)"); the rest are numbers
    pub fn is_free_text(self) -> bool {
        matches!(
            self,
            NutritionField::ServingSize | NutritionField::ServingsPerContainer
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NutritionField::ServingSize => "servingSize",
            NutritionField::ServingsPerContainer => "servingsPerContainer",
            NutritionField::Calories => "calories",
            NutritionField::Protein => "protein",
            NutritionField::Carbohydrates => "carbohydrates",
            NutritionField::Sugar => "sugar",
            NutritionField::Fiber => "fiber",
            NutritionField::Fat => "fat",
            NutritionField::Sodium => "sodium",
        }
    }
}

impl std::fmt::Display for NutritionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values found on a label. `None` means "not found", never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings_per_container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbohydrates: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    /// Grams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
    /// Milligrams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
}

impl NutritionMatch {
    /// Number of populated fields, name included
    pub fn fields_found(&self) -> usize {
        let text = [&self.name, &self.serving_size, &self.servings_per_container]
            .iter()
            .filter(|v| v.is_some())
            .count();
        let numbers = [
            self.calories,
            self.protein,
            self.carbohydrates,
            self.sugar,
            self.fiber,
            self.fat,
            self.sodium,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count();
        text + numbers
    }

    pub fn is_empty(&self) -> bool {
        self.fields_found() == 0
    }

    /// Numeric value of a field, `None` for free-text fields
    pub fn number(&self, field: NutritionField) -> Option<f64> {
        match field {
            NutritionField::Calories => self.calories,
            NutritionField::Protein => self.protein,
            NutritionField::Carbohydrates => self.carbohydrates,
            NutritionField::Sugar => self.sugar,
            NutritionField::Fiber => self.fiber,
            NutritionField::Fat => self.fat,
            NutritionField::Sodium => self.sodium,
            NutritionField::ServingSize | NutritionField::ServingsPerContainer => None,
        }
    }

    fn set_text(&mut self, field: NutritionField, value: String) {
        match field {
            NutritionField::ServingSize => self.serving_size = Some(value),
            NutritionField::ServingsPerContainer => self.servings_per_container = Some(value),
            _ => {}
        }
    }

    fn set_number(&mut self, field: NutritionField, value: f64) {
        match field {
            NutritionField::Calories => self.calories = Some(value),
            NutritionField::Protein => self.protein = Some(value),
            NutritionField::Carbohydrates => self.carbohydrates = Some(value),
            NutritionField::Sugar => self.sugar = Some(value),
            NutritionField::Fiber => self.fiber = Some(value),
            NutritionField::Fat => self.fat = Some(value),
            NutritionField::Sodium => self.sodium = Some(value),
            NutritionField::ServingSize | NutritionField::ServingsPerContainer => {}
        }
    }
}

/// Synonyms per field. Terms are matched case-insensitively as substrings;
/// a leading `^` anchors a term to the start of the line.
///
/// Loaded from JSON shaped like `{"protein": ["โปรตีน", "^protein"], ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermDictionary {
    terms: BTreeMap<NutritionField, Vec<String>>,
}

impl TermDictionary {
    pub fn new(terms: BTreeMap<NutritionField, Vec<String>>) -> AppResult<Self> {
        let dictionary = Self {
            terms: terms
                .into_iter()
                .map(|(field, terms)| {
                    (field, terms.into_iter().map(|t| t.to_lowercase()).collect())
                })
                .collect(),
        };
        dictionary.validate()?;
        Ok(dictionary)
    }

    /// Thai label terms plus their English equivalents, so both raw and
    /// translated text can be parsed.
    ///
    /// Short English words are anchored: they also show up in product names
    /// and in lines such as `Calories from fat`.
    pub fn thai_default() -> Self {
        let entries: [(NutritionField, &[&str]); 7] = [
            (
                NutritionField::ServingSize,
                &["หนึ่งหน่วยบริโภค", "ขนาดหนึ่งหน่วยบริโภค", "^serving size"],
            ),
            (
                NutritionField::ServingsPerContainer,
                &[
                    "จำนวนหน่วยบริโภคต่อ",
                    "จำนวนหน่วยบริโภคต่อบรรจุภัณฑ์",
                    "servings per container",
                    "servings per package",
                ],
            ),
            (
                NutritionField::Calories,
                &["พลังงาน", "แคลอรี่", "^energy", "total energy", "^calorie"],
            ),
            (NutritionField::Protein, &["โปรตีน", "^protein"]),
            (
                NutritionField::Carbohydrates,
                &[
                    "คาร์โบไฮเดรต",
                    "คาร์โบไฮเดรตทั้งหมด",
                    "^carbohydrate",
                    "total carbohydrate",
                ],
            ),
            (
                NutritionField::Fat,
                &["ไขมัน", "ไขมันทั้งหมด", "^fat", "total fat"],
            ),
            (NutritionField::Sodium, &["โซเดียม", "^sodium"]),
        ];

        Self {
            terms: entries
                .iter()
                .map(|(field, terms)| (*field, terms.iter().map(|t| t.to_string()).collect()))
                .collect(),
        }
    }

    /// Load a dictionary from a JSON file
    pub fn load_from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read term dictionary '{}': {}",
                path.display(),
                e
            ))
        })?;
        let raw: BTreeMap<NutritionField, Vec<String>> = serde_json::from_str(&content)
            .map_err(|e| {
                AppError::Config(format!(
                    "Failed to parse term dictionary '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        let dictionary = Self::new(raw)?;
        info!(
            path = %path.display(),
            fields = dictionary.terms.len(),
            "Loaded nutrition term dictionary"
        );
        Ok(dictionary)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.terms.values().all(|terms| terms.is_empty()) {
            return Err(AppError::Config(
                "term dictionary must define at least one field".to_string(),
            ));
        }
        for (field, terms) in &self.terms {
            for term in terms {
                if term.trim_start_matches('^').trim().is_empty() {
                    return Err(AppError::Config(format!(
                        "term dictionary has a blank term for '{}'",
                        field
                    )));
                }
                if term.chars().any(char::is_control) {
                    return Err(AppError::Config(format!(
                        "term '{}' for '{}' contains control characters",
                        term.escape_debug(),
                        field
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn terms(&self, field: NutritionField) -> &[String] {
        self.terms.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a lowercased line matches any term of any field
    fn mentions_any(&self, lowered: &str) -> bool {
        self.terms
            .values()
            .flatten()
            .any(|term| term_matches(term, lowered))
    }
}

/// Match one lowercased term against a lowercased line
fn term_matches(term: &str, lowered: &str) -> bool {
    match term.strip_prefix('^') {
        Some(anchored) => lowered.starts_with(anchored),
        None => lowered.contains(term),
    }
}

impl Default for TermDictionary {
    fn default() -> Self {
        Self::thai_default()
    }
}

/// Extractor settings
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// JSON term dictionary replacing the built-in one
    pub terms_path: Option<String>,
    pub name_scan_lines: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            terms_path: None,
            name_scan_lines: DEFAULT_NAME_SCAN_LINES,
        }
    }
}

impl ParserConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.name_scan_lines == 0 {
            return Err(AppError::Config(
                "name_scan_lines must be greater than 0".to_string(),
            ));
        }
        if let Some(path) = &self.terms_path {
            if !Path::new(path).is_file() {
                return Err(AppError::Config(format!(
                    "NUTRITION_TERMS_PATH '{}' is not a readable file",
                    path
                )));
            }
        }
        Ok(())
    }
}

/// Table-driven nutrition field extractor
#[derive(Debug, Clone)]
pub struct NutritionParser {
    dictionary: TermDictionary,
    name_scan_lines: usize,
}

impl NutritionParser {
    pub fn new(dictionary: TermDictionary, name_scan_lines: usize) -> Self {
        Self {
            dictionary,
            name_scan_lines,
        }
    }

    pub fn from_config(config: &ParserConfig) -> AppResult<Self> {
        let dictionary = match &config.terms_path {
            Some(path) => TermDictionary::load_from_file(path)?,
            None => TermDictionary::thai_default(),
        };
        Ok(Self::new(dictionary, config.name_scan_lines))
    }

    pub fn dictionary(&self) -> &TermDictionary {
        &self.dictionary
    }

    /// Extract every field the dictionary can find in `text`
    pub fn parse(&self, text: &str) -> NutritionMatch {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let lowered: Vec<String> = lines.iter().map(|l| l.to_lowercase()).collect();

        let mut result = NutritionMatch {
            name: lines
                .iter()
                .zip(&lowered)
                .take(self.name_scan_lines)
                .find(|(_, low)| !self.dictionary.mentions_any(low))
                .map(|(line, _)| line.to_string()),
            ..Default::default()
        };

        for field in NutritionField::ALL {
            let terms = self.dictionary.terms(field);
            if terms.is_empty() {
                continue;
            }

            let Some(index) = lowered
                .iter()
                .position(|low| terms.iter().any(|t| term_matches(t, low)))
            else {
                continue;
            };
            let line = lines[index];

            if field.is_free_text() {
                if let Some(value) = text_after_colon(line) {
                    result.set_text(field, value);
                }
            } else if let Some(value) = extract_number(line) {
                result.set_number(field, value);
            }
        }

        let found = result.fields_found();
        observability::record_extraction(found);
        debug!(lines = lines.len(), fields_found = found, "Nutrition text parsed");
        result
    }
}

impl Default for NutritionParser {
    fn default() -> Self {
        Self::new(TermDictionary::thai_default(), DEFAULT_NAME_SCAN_LINES)
    }
}

/// Parse with the built-in dictionary
pub fn parse_nutrition_text(text: &str) -> NutritionMatch {
    DEFAULT_PARSER.parse(text)
}

/// First decimal number in `text`
pub fn extract_number(text: &str) -> Option<f64> {
    NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Trimmed text after the last colon, if there is any
fn text_after_colon(line: &str) -> Option<String> {
    let (_, value) = line.rsplit_once(':')?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_number() {
        assert_eq!(extract_number("โปรตีน 5 ก."), Some(5.0));
        assert_eq!(extract_number("fat 3.5 g / 7%"), Some(3.5));
        assert_eq!(extract_number("no digits"), None);
        // Thai digits are not treated as numbers
        assert_eq!(extract_number("๑๒"), None);
    }

    #[test]
    fn test_text_after_colon() {
        assert_eq!(text_after_colon("Serving size: 30 g"), Some("30 g".to_string()));
        assert_eq!(text_after_colon("a: b: c "), Some("c".to_string()));
        assert_eq!(text_after_colon("Serving size 30 g"), None);
        assert_eq!(text_after_colon("Serving size:   "), None);
    }

    #[test]
    fn test_default_dictionary_is_valid() {
        let dictionary = TermDictionary::thai_default();
        assert!(dictionary.validate().is_ok());
        assert!(dictionary.terms(NutritionField::Sugar).is_empty());
        assert!(!dictionary.terms(NutritionField::Sodium).is_empty());
    }

    #[test]
    fn test_dictionary_rejects_blank_terms() {
        let mut terms = BTreeMap::new();
        terms.insert(NutritionField::Protein, vec!["  ".to_string()]);
        assert!(TermDictionary::new(terms).is_err());
        assert!(TermDictionary::new(BTreeMap::new()).is_err());
    }

    #[test]
    fn test_matching_ignores_case() {
        let parsed = parse_nutrition_text("PROTEIN 12 g\nSodium 40 mg");
        assert_eq!(parsed.protein, Some(12.0));
        assert_eq!(parsed.sodium, Some(40.0));
        assert_eq!(parsed.name, None);
    }

    #[test]
    fn test_fields_found_counts_name() {
        let parsed = parse_nutrition_text("Crackers\nEnergy 120 kcal");
        assert_eq!(parsed.fields_found(), 2);
        assert!(!parsed.is_empty());
    }

    #[test]
    fn test_serializes_camel_case_without_missing_fields() {
        let parsed = NutritionMatch {
            servings_per_container: Some("4".to_string()),
            calories: Some(250.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"servingsPerContainer": "4", "calories": 250.0})
        );
    }
}
