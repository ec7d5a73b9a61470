//! # Nutrition Parser Tests
//!
//! Field extraction from raw Thai and translated English label text.

mod test_helpers;

#[cfg(test)]
mod tests {
    use super::test_helpers::SUPER_SNACK_LABEL;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tummy_scan::nutrition_parser::{
        parse_nutrition_text, NutritionField, NutritionMatch, NutritionParser, ParserConfig,
        TermDictionary,
    };

    #[test]
    fn test_super_snack_label() {
        let parsed = parse_nutrition_text(SUPER_SNACK_LABEL);
        assert_eq!(
            parsed,
            NutritionMatch {
                name: Some("SuperSnack".to_string()),
                calories: Some(250.0),
                protein: Some(5.0),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_sodium_only() {
        let parsed = parse_nutrition_text("โซเดียม: 150");
        assert_eq!(parsed.sodium, Some(150.0));
        assert_eq!(parsed.calories, None);
        assert_eq!(parsed.protein, None);
        assert_eq!(parsed.carbohydrates, None);
        assert_eq!(parsed.fat, None);
        assert_eq!(parsed.name, None);
    }

    #[test]
    fn test_empty_input_sets_nothing() {
        assert!(parse_nutrition_text("").is_empty());
        assert!(parse_nutrition_text("\n \n").is_empty());
    }

    #[test]
    fn test_name_not_taken_when_first_lines_are_terms() {
        let text = "พลังงาน 200\nโปรตีน 4\nไขมัน 9\nโซเดียม 120\nคาร์โบไฮเดรต 30\nPlain Name";
        let parsed = parse_nutrition_text(text);
        assert_eq!(parsed.name, None);
        assert_eq!(parsed.carbohydrates, Some(30.0));
    }

    #[test]
    fn test_serving_fields_use_text_after_colon() {
        let text = "หนึ่งหน่วยบริโภค: 1 ซอง (30 ก.)\nจำนวนหน่วยบริโภคต่อบรรจุภัณฑ์: 4";
        let parsed = parse_nutrition_text(text);
        assert_eq!(parsed.serving_size.as_deref(), Some("1 ซอง (30 ก.)"));
        assert_eq!(parsed.servings_per_container.as_deref(), Some("4"));
    }

    #[test]
    fn test_serving_without_colon_stays_unset() {
        let parsed = parse_nutrition_text("Serving size 30 g");
        assert_eq!(parsed.serving_size, None);
    }

    #[test]
    fn test_translated_english_label() {
        let text = "Crispy Seaweed\nServing size: 1 pack (30 g)\nServings per container: 2\nEnergy 160 kcal\nTotal fat 9 g\nProtein 3 g\nTotal carbohydrate 17 g\nSodium 270 mg";
        let parsed = parse_nutrition_text(text);
        assert_eq!(parsed.name.as_deref(), Some("Crispy Seaweed"));
        assert_eq!(parsed.serving_size.as_deref(), Some("1 pack (30 g)"));
        assert_eq!(parsed.servings_per_container.as_deref(), Some("2"));
        assert_eq!(parsed.calories, Some(160.0));
        assert_eq!(parsed.fat, Some(9.0));
        assert_eq!(parsed.protein, Some(3.0));
        assert_eq!(parsed.carbohydrates, Some(17.0));
        assert_eq!(parsed.sodium, Some(270.0));
    }

    /// First matching line wins, even when a later line is the better match
    #[test]
    fn test_first_match_wins() {
        let parsed = parse_nutrition_text("Calories from fat 90\nCalories 250");
        assert_eq!(parsed.calories, Some(90.0));
        // "fat" only counts at the start of a line
        assert_eq!(parsed.fat, None);
    }

    #[test]
    fn test_product_name_with_nutrient_word() {
        let parsed = parse_nutrition_text("Low Fat Crackers\nTotal fat 3 g\nEnergy 120 kcal");
        assert_eq!(parsed.name.as_deref(), Some("Low Fat Crackers"));
        assert_eq!(parsed.fat, Some(3.0));
        assert_eq!(parsed.calories, Some(120.0));

        let parsed = parse_nutrition_text("High Protein Energy Bar\nProtein 20 g");
        assert_eq!(parsed.name.as_deref(), Some("High Protein Energy Bar"));
        assert_eq!(parsed.protein, Some(20.0));
        assert_eq!(parsed.calories, None);
    }

    #[test]
    fn test_anchored_terms_in_custom_dictionary() {
        let mut terms = BTreeMap::new();
        terms.insert(NutritionField::Sugar, vec!["^Sugars".to_string()]);
        let parser = NutritionParser::new(TermDictionary::new(terms).unwrap(), 5);

        let parsed = parser.parse("No Added Sugars Jam\nSugars 9 g");
        assert_eq!(parsed.name.as_deref(), Some("No Added Sugars Jam"));
        assert_eq!(parsed.sugar, Some(9.0));

        let mut terms = BTreeMap::new();
        terms.insert(NutritionField::Sugar, vec!["^ ".to_string()]);
        assert!(TermDictionary::new(terms).is_err());
    }

    #[test]
    fn test_decimal_values() {
        let parsed = parse_nutrition_text("ไขมันทั้งหมด 3.5 ก.");
        assert_eq!(parsed.fat, Some(3.5));
    }

    #[test]
    fn test_matched_line_without_number_stays_unset() {
        let parsed = parse_nutrition_text("โปรตีน น้อยกว่า 1 ก.\nProtein trace");
        assert_eq!(parsed.protein, Some(1.0));
        let parsed = parse_nutrition_text("Protein trace");
        assert_eq!(parsed.protein, None);
    }

    #[test]
    fn test_custom_dictionary_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sugar": ["Zucker"], "fiber": ["Ballaststoffe"], "calories": ["Brennwert"]}}"#
        )
        .unwrap();

        let config = ParserConfig {
            terms_path: Some(file.path().to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let parser = NutritionParser::from_config(&config).unwrap();

        let parsed = parser.parse("Knusper Riegel\nBrennwert 420 kcal\nZUCKER 12 g\nBallaststoffe 3,1 g");
        assert_eq!(parsed.name.as_deref(), Some("Knusper Riegel"));
        assert_eq!(parsed.calories, Some(420.0));
        assert_eq!(parsed.sugar, Some(12.0));
        assert_eq!(parsed.fiber, Some(3.0));
        assert_eq!(parsed.protein, None);
    }

    #[test]
    fn test_invalid_dictionary_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"protein": [""]}}"#).unwrap();
        assert!(TermDictionary::load_from_file(file.path()).is_err());

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"vitamins": ["C"]}}"#).unwrap();
        assert!(TermDictionary::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_name_scan_window_is_configurable() {
        let mut terms = BTreeMap::new();
        terms.insert(NutritionField::Protein, vec!["protein".to_string()]);
        let parser = NutritionParser::new(TermDictionary::new(terms).unwrap(), 1);

        let parsed = parser.parse("Protein 4 g\nBar");
        assert_eq!(parsed.name, None);
        assert_eq!(parsed.protein, Some(4.0));
    }
}
