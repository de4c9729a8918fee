//! Line-adjacency strategy.
//!
//! Looks for a row carrying the code number or its label keyword and takes the
//! first number on that row or the next one that falls inside the code's
//! plausible range. The range filter trades recall for precision.

use std::collections::BTreeMap;

use tracing::debug;

use crate::decode::{DecodedDocument, DecodedText};
use crate::extract::rules::patterns::NUMBER_TOKEN;
use crate::extract::rules::{fold_accents, numeric_tokens};
use crate::extract::{ExtractionAccumulator, ExtractionStrategy, PartialExtraction, Result, Signal};
use crate::models::config::ExtractionConfig;
use crate::models::f29::{CodeRange, ExtractionMethod, F29Code};

/// Visual / positional strategy.
pub struct VisualStrategy {
    ranges: BTreeMap<F29Code, CodeRange>,
}

impl VisualStrategy {
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            ranges: config.visual_ranges.clone(),
        }
    }

    fn scan_text(&self, text: &DecodedText, acc: &mut ExtractionAccumulator) {
        let lines: Vec<&str> = text
            .text
            .split(['\n', '\r'])
            .filter(|l| !l.trim().is_empty())
            .collect();
        let folded: Vec<String> = lines.iter().map(|l| fold_accents(l)).collect();

        for code in F29Code::ALL {
            if acc.has_code(code) {
                continue;
            }
            // Codes without a configured range are not scanned
            let Some(range) = self.ranges.get(&code) else {
                continue;
            };

            for (i, line) in lines.iter().enumerate() {
                let labelled = line.contains(code.label())
                    || code.keywords().iter().any(|k| folded[i].contains(k));
                if !labelled {
                    continue;
                }

                let mut tokens = numeric_tokens(line);
                if let Some(next) = lines.get(i + 1).filter(|next| !starts_code_row(next)) {
                    tokens.extend(numeric_tokens(next));
                }

                if let Some(value) = tokens.into_iter().find(|v| range.contains(*v)) {
                    acc.record_code(
                        code,
                        value,
                        Signal::VisualMatch,
                        format!(
                            "{} ({}) = {} [visual, line {}, {}]",
                            code.description(),
                            code,
                            value,
                            i + 1,
                            text.label()
                        ),
                    );
                    break;
                }
            }
        }
    }
}

/// Whether the line's first number is a code label, i.e. it is another row.
fn starts_code_row(line: &str) -> bool {
    NUMBER_TOKEN
        .find(line)
        .is_some_and(|m| F29Code::from_label(m.as_str()).is_some())
}

impl Default for VisualStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStrategy for VisualStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Visual
    }

    fn extract(&self, document: &DecodedDocument) -> Result<PartialExtraction> {
        let mut acc = ExtractionAccumulator::new(self.method());

        for text in document.texts() {
            self.scan_text(text, &mut acc);
            if acc.codes_complete() {
                break;
            }
        }

        let partial = acc.finish();
        debug!(
            "Visual strategy found {} codes (confidence {})",
            partial.codes.present_count(),
            partial.confidence
        );
        Ok(partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::DecodingConfig;

    fn extract(text: &str) -> PartialExtraction {
        let doc = DecodedDocument::from_bytes(text.as_bytes(), &DecodingConfig::default());
        VisualStrategy::new().extract(&doc).unwrap()
    }

    #[test]
    fn test_keyword_and_next_line() {
        let partial = extract("TOTAL DÉBITOS\n3.410.651\nCRÉDITO FISCAL 4.188.643\n");
        assert_eq!(partial.codes.debito_fiscal, Some(3_410_651));
        assert_eq!(partial.codes.credito_fiscal, Some(4_188_643));
        assert_eq!(partial.confidence, 50);
    }

    #[test]
    fn test_range_filter_rejects_implausible() {
        // 538 expects 1M-10M; 250 and 99.000.000 are skipped
        let partial = extract("538 DEBITOS 250 99.000.000\n");
        assert_eq!(partial.codes.debito_fiscal, None);
        assert_eq!(partial.confidence, 0);
    }

    #[test]
    fn test_code_number_on_line() {
        let partial = extract("[062] 45.000\n[077] 1.200.000\n[563] 17.950.795");
        assert_eq!(partial.codes.ppm, Some(45_000));
        assert_eq!(partial.codes.remanente, Some(1_200_000));
        assert_eq!(partial.codes.ventas_netas, Some(17_950_795));
        assert!(partial.detected_values.iter().all(|v| v.contains("visual")));
    }

    #[test]
    fn test_next_row_is_not_borrowed() {
        let partial = extract("538 Debitos\n511 Credito 4.188.643\n");
        assert_eq!(partial.codes.debito_fiscal, None);
        assert_eq!(partial.codes.credito_fiscal, Some(4_188_643));
        assert_eq!(partial.confidence, 25);
    }

    #[test]
    fn test_custom_ranges() {
        let mut config = ExtractionConfig::default();
        config.visual_ranges = BTreeMap::from([(F29Code::Ppm, CodeRange::new(1, 100))]);
        let doc = DecodedDocument::from_bytes(b"PPM 42\nDEBITOS 3.410.651", &DecodingConfig::default());
        let partial = VisualStrategy::from_config(&config).extract(&doc).unwrap();

        assert_eq!(partial.codes.ppm, Some(42));
        assert_eq!(partial.codes.debito_fiscal, None);
    }
}
