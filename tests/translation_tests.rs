//! # Translation Tests
//!
//! Order preservation, per-line fallback and concurrency bounds of the
//! line-wise translator.

mod test_helpers;

#[cfg(test)]
mod tests {
    use super::test_helpers::{DownTranslator, TableTranslator};
    use std::sync::Arc;
    use tummy_scan::progress::ProgressReporter;
    use tummy_scan::translation::{TranslationConfig, Translator};

    fn translator(backend: impl tummy_scan::translation::LineTranslator + 'static) -> Translator {
        Translator::with_backend(Arc::new(backend), TranslationConfig::default())
    }

    /// N non-empty lines in, N lines out, in input order, even when later
    /// lines finish first
    #[tokio::test]
    async fn test_output_keeps_line_count_and_order() {
        let backend = TableTranslator::new(&[
            ("SuperSnack", "SuperSnack"),
            ("พลังงาน 250 กิโลแคลอรี่", "Energy 250 kcal"),
            ("โปรตีน 5 ก.", "Protein 5 g"),
            ("โซเดียม 150 มก.", "Sodium 150 mg"),
        ])
        .staggered();
        let input = "SuperSnack\n\nพลังงาน 250 กิโลแคลอรี่\n   \nโปรตีน 5 ก.\nโซเดียม 150 มก.\n";

        let output = translator(backend)
            .translate_text(input, &ProgressReporter::disabled())
            .await;

        assert_eq!(
            output,
            "SuperSnack\nEnergy 250 kcal\nProtein 5 g\nSodium 150 mg"
        );
    }

    /// Every line failing gives back the original (non-empty) lines
    #[tokio::test]
    async fn test_all_failures_return_original_lines() {
        let input = "พลังงาน 250\n\nโปรตีน 5 ก.";
        let output = translator(DownTranslator)
            .translate_text(input, &ProgressReporter::disabled())
            .await;
        assert_eq!(output, "พลังงาน 250\nโปรตีน 5 ก.");
    }

    /// Only the failing line falls back
    #[tokio::test]
    async fn test_partial_failure_falls_back_per_line() {
        let backend = TableTranslator::new(&[("ไขมัน 3 ก.", "Fat 3 g")]);
        let output = translator(backend)
            .translate_text("ไขมัน 3 ก.\nอื่นๆ", &ProgressReporter::disabled())
            .await;
        assert_eq!(output, "Fat 3 g\nอื่นๆ");
    }

    /// Empty input makes no calls and yields empty output
    #[tokio::test]
    async fn test_empty_input() {
        let backend = Arc::new(TableTranslator::new(&[]));
        let translator = Translator::with_backend(backend.clone(), TranslationConfig::default());
        let output = translator
            .translate_text("\n  \n", &ProgressReporter::disabled())
            .await;
        assert_eq!(output, "");
        assert_eq!(backend.calls(), 0);
    }

    /// A concurrency limit of one still translates every line in order
    #[tokio::test]
    async fn test_serial_limit() {
        let config = TranslationConfig {
            max_concurrent_requests: 1,
            ..Default::default()
        };
        let backend = TableTranslator::new(&[("a", "A"), ("b", "B"), ("c", "C")]);
        let output = Translator::with_backend(Arc::new(backend), config)
            .translate_text("a\nb\nc", &ProgressReporter::disabled())
            .await;
        assert_eq!(output, "A\nB\nC");
    }

    /// The passthrough translator only drops blank lines
    #[tokio::test]
    async fn test_passthrough() {
        let output = Translator::passthrough()
            .translate_text("x\n\ny", &ProgressReporter::disabled())
            .await;
        assert_eq!(output, "x\ny");
    }
}
