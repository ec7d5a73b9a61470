//! Nutrition entry form: pre-filled from a scan, completed by the user,
//! validated into a [`FoodItemDraft`] for the food log store.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::AppError;
use crate::nutrition_parser::NutritionMatch;

lazy_static! {
    static ref EAN_13: Regex = Regex::new(r"^[0-9]{13}$").expect("EAN_13 is a valid regex");
    static ref UPC_A: Regex = Regex::new(r"^[0-9]{12}$").expect("UPC_A is a valid regex");
    static ref UPC_E: Regex = Regex::new(r"^[0-9]{8}$").expect("UPC_E is a valid regex");
}

/// Barcode symbologies the scanner reads, plus hand-typed codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    Ean13,
    UpcA,
    UpcE,
    /// Typed by the user; only checked for being printable
    Manual,
}

impl BarcodeFormat {
    /// Classify a barcode by shape. `None` for blank or unprintable input.
    pub fn detect(barcode: &str) -> Option<Self> {
        let code = barcode.trim();
        if code.is_empty() || code.chars().any(char::is_control) {
            return None;
        }
        let format = if EAN_13.is_match(code) {
            BarcodeFormat::Ean13
        } else if UPC_A.is_match(code) {
            BarcodeFormat::UpcA
        } else if UPC_E.is_match(code) {
            BarcodeFormat::UpcE
        } else {
            BarcodeFormat::Manual
        };
        Some(format)
    }
}

/// Form inputs that can carry a validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    Barcode,
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

impl FormField {
    pub fn label(self) -> &'static str {
        match self {
            FormField::Barcode => "Barcode",
            FormField::ServingSize => "Serving size",
            FormField::ServingsPerContainer => "Servings per container",
            FormField::Calories => "Calories",
            FormField::Protein => "Protein",
            FormField::Carbohydrates => "Carbohydrates",
            FormField::Sugar => "Sugar",
            FormField::Fiber => "Fiber",
            FormField::Fat => "Fat",
            FormField::Sodium => "Sodium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldError {
    Required,
    NotANumber,
    MustBePositive,
    MustNotBeNegative,
    InvalidBarcode,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            FieldError::Required => "is required",
            FieldError::NotANumber => "must be a number",
            FieldError::MustBePositive => "must be greater than 0",
            FieldError::MustNotBeNegative => "must be 0 or more",
            FieldError::InvalidBarcode => "is not a valid barcode",
        };
        f.write_str(message)
    }
}

/// All problems found in one submission, keyed by field
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors {
    errors: BTreeMap<FormField, FieldError>,
}

impl FormErrors {
    pub fn get(&self, field: FormField) -> Option<FieldError> {
        self.errors.get(&field).copied()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fields left blank that the user still has to fill in
    pub fn missing_fields(&self) -> Vec<FormField> {
        self.errors
            .iter()
            .filter(|(_, e)| **e == FieldError::Required)
            .map(|(f, _)| *f)
            .collect()
    }

    fn insert(&mut self, field: FormField, error: FieldError) {
        self.errors.insert(field, error);
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, error)| format!("{} {}", field.label(), error))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for FormErrors {}

impl From<FormErrors> for AppError {
    fn from(errors: FormErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Validated entry, ready for the food log store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItemDraft {
    pub barcode: String,
    pub barcode_format: BarcodeFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub serving_size: String,
    pub servings_per_container: String,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub sugar: f64,
    pub fiber: f64,
    pub fat: f64,
    pub sodium: f64,
}

/// String-valued form state; an empty string is a blank input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionForm {
    pub name: String,
    pub serving_size: String,
    pub servings_per_container: String,
    pub calories: String,
    pub protein: String,
    pub carbohydrates: String,
    pub sugar: String,
    pub fiber: String,
    pub fat: String,
    pub sodium: String,
}

fn render_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl NutritionForm {
    /// Pre-fill from scan results; fields the scan did not find stay blank
    pub fn prefill(parsed: &NutritionMatch) -> Self {
        Self {
            name: parsed.name.clone().unwrap_or_default(),
            serving_size: parsed.serving_size.clone().unwrap_or_default(),
            servings_per_container: parsed.servings_per_container.clone().unwrap_or_default(),
            calories: render_number(parsed.calories),
            protein: render_number(parsed.protein),
            carbohydrates: render_number(parsed.carbohydrates),
            sugar: render_number(parsed.sugar),
            fiber: render_number(parsed.fiber),
            fat: render_number(parsed.fat),
            sodium: render_number(parsed.sodium),
        }
    }

    /// Check the completed form and the product barcode.
    ///
    /// Every field is checked; all problems are reported together.
    pub fn validate(&self, barcode: &str) -> Result<FoodItemDraft, FormErrors> {
        let mut errors = FormErrors::default();

        let barcode = barcode.trim();
        let barcode_format = if barcode.is_empty() {
            errors.insert(FormField::Barcode, FieldError::Required);
            None
        } else {
            let format = BarcodeFormat::detect(barcode);
            if format.is_none() {
                errors.insert(FormField::Barcode, FieldError::InvalidBarcode);
            }
            format
        };

        let serving_size = required_text(&mut errors, FormField::ServingSize, &self.serving_size);
        let servings_per_container = required_text(
            &mut errors,
            FormField::ServingsPerContainer,
            &self.servings_per_container,
        );

        let calories = required_number(&mut errors, FormField::Calories, &self.calories, true);
        let mut nutrient = |field, value: &str| required_number(&mut errors, field, value, false);
        let protein = nutrient(FormField::Protein, &self.protein);
        let carbohydrates = nutrient(FormField::Carbohydrates, &self.carbohydrates);
        let sugar = nutrient(FormField::Sugar, &self.sugar);
        let fiber = nutrient(FormField::Fiber, &self.fiber);
        let fat = nutrient(FormField::Fat, &self.fat);
        let sodium = nutrient(FormField::Sodium, &self.sodium);

        match (
            barcode_format,
            serving_size,
            servings_per_container,
            calories,
            protein,
            carbohydrates,
            sugar,
            fiber,
            fat,
            sodium,
        ) {
            (
                Some(barcode_format),
                Some(serving_size),
                Some(servings_per_container),
                Some(calories),
                Some(protein),
                Some(carbohydrates),
                Some(sugar),
                Some(fiber),
                Some(fat),
                Some(sodium),
            ) if errors.is_empty() => {
                let name = self.name.trim();
                Ok(FoodItemDraft {
                    barcode: barcode.to_string(),
                    barcode_format,
                    name: (!name.is_empty()).then(|| name.to_string()),
                    serving_size,
                    servings_per_container,
                    calories,
                    protein,
                    carbohydrates,
                    sugar,
                    fiber,
                    fat,
                    sodium,
                })
            }
            _ => Err(errors),
        }
    }
}

fn required_text(errors: &mut FormErrors, field: FormField, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        errors.insert(field, FieldError::Required);
        return None;
    }
    Some(value.to_string())
}

fn required_number(
    errors: &mut FormErrors,
    field: FormField,
    value: &str,
    strictly_positive: bool,
) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        errors.insert(field, FieldError::Required);
        return None;
    }
    let number = match value.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => {
            errors.insert(field, FieldError::NotANumber);
            return None;
        }
    };
    if strictly_positive && number <= 0.0 {
        errors.insert(field, FieldError::MustBePositive);
        return None;
    }
    if number < 0.0 {
        errors.insert(field, FieldError::MustNotBeNegative);
        return None;
    }
    Some(number)
}
