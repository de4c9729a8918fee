//! Per-encoding regex and proximity search.
//!
//! PDF streams often corrupt the whitespace and control bytes around numbers,
//! so a strict label regex is backed by a looser window scan that scores lower.

use regex::Regex;
use tracing::debug;

use crate::decode::{DecodedDocument, DecodedText};
use crate::error::ExtractionError;
use crate::extract::rules::parse_clp_amount;
use crate::extract::rules::patterns::NUMBER_TOKEN;
use crate::extract::{ExtractionAccumulator, ExtractionStrategy, PartialExtraction, Result, Signal};
use crate::models::config::ExtractionConfig;
use crate::models::f29::{ExtractionMethod, F29Code};

/// Value shapes tried after a code label, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueShape {
    /// 3.410.651
    Grouped,
    /// 3410651
    Bare,
    /// Any digit run with separators.
    Loose,
}

impl ValueShape {
    const ALL: [ValueShape; 3] = [ValueShape::Grouped, ValueShape::Bare, ValueShape::Loose];

    fn label(&self) -> &'static str {
        match self {
            ValueShape::Grouped => "grouped",
            ValueShape::Bare => "bare",
            ValueShape::Loose => "loose",
        }
    }

    fn value_pattern(&self) -> &'static str {
        match self {
            ValueShape::Grouped => r"(\d{1,3}(?:\.\d{3})+)",
            ValueShape::Bare => r"(\d{4,})",
            ValueShape::Loose => r"(\d[\d.,]*)",
        }
    }
}

type CodePatterns = Vec<(F29Code, Vec<(ValueShape, Regex)>)>;

/// Regex / proximity strategy.
pub struct BinaryPatternStrategy {
    patterns: std::result::Result<CodePatterns, regex::Error>,
    proximity_window: usize,
    proximity_min_value: u64,
}

impl BinaryPatternStrategy {
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            patterns: compile(config.label_gap),
            proximity_window: config.proximity_window,
            proximity_min_value: config.proximity_min_value,
        }
    }

    /// Scan one decoded text for the codes the accumulator still lacks.
    fn scan_text(
        &self,
        text: &DecodedText,
        patterns: &[(F29Code, Vec<(ValueShape, Regex)>)],
        acc: &mut ExtractionAccumulator,
    ) {
        for (code, shapes) in patterns {
            if acc.has_code(*code) {
                continue;
            }

            if let Some((shape, value)) = regex_value(&text.text, shapes) {
                acc.record_code(
                    *code,
                    value,
                    Signal::RegexMatch,
                    format!(
                        "{} ({}) = {} [regex/{}, {}]",
                        code.description(),
                        code,
                        value,
                        shape.label(),
                        text.label()
                    ),
                );
                continue;
            }

            if let Some(value) = self.proximity_value(&text.text, code.label()) {
                acc.record_code(
                    *code,
                    value,
                    Signal::ProximityMatch,
                    format!(
                        "{} ({}) = {} [proximity, {}]",
                        code.description(),
                        code,
                        value,
                        text.label()
                    ),
                );
            }
        }
    }

    /// First token above the minimum in the window after the bare label, else the first token.
    ///
    /// The window ends at the next code label.
    fn proximity_value(&self, text: &str, label: &str) -> Option<u64> {
        let start = text.find(label)? + label.len();
        let window: String = text[start..].chars().take(self.proximity_window).collect();

        let tokens: Vec<u64> = NUMBER_TOKEN
            .find_iter(&window)
            .take_while(|m| F29Code::from_label(m.as_str()).is_none())
            .filter_map(|m| parse_clp_amount(m.as_str()))
            .filter(|v| *v > 0)
            .collect();
        tokens
            .iter()
            .copied()
            .find(|v| *v > self.proximity_min_value)
            .or_else(|| tokens.first().copied())
    }
}

impl Default for BinaryPatternStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStrategy for BinaryPatternStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::BinaryRegex
    }

    fn extract(&self, document: &DecodedDocument) -> Result<PartialExtraction> {
        let patterns = self
            .patterns
            .as_ref()
            .map_err(|e| ExtractionError::Strategy {
                strategy: ExtractionMethod::BinaryRegex,
                reason: e.to_string(),
            })?;
        let mut acc = ExtractionAccumulator::new(self.method());

        for text in document.texts() {
            self.scan_text(text, patterns, &mut acc);
            if acc.codes_complete() {
                break;
            }
        }

        let partial = acc.finish();
        debug!(
            "Binary strategy found {} codes (confidence {})",
            partial.codes.present_count(),
            partial.confidence
        );
        Ok(partial)
    }
}

fn compile(label_gap: usize) -> std::result::Result<CodePatterns, regex::Error> {
    F29Code::ALL
        .into_iter()
        .map(|code| {
            let shapes = ValueShape::ALL
                .into_iter()
                .map(|shape| {
                    // Label not preceded by a digit, then up to `label_gap` non-digits
                    let pattern = format!(
                        r"(?:^|\D){}\D{{0,{}}}{}",
                        code.label(),
                        label_gap,
                        shape.value_pattern()
                    );
                    Regex::new(&pattern).map(|re| (shape, re))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok((code, shapes))
        })
        .collect()
}

fn regex_value(text: &str, shapes: &[(ValueShape, Regex)]) -> Option<(ValueShape, u64)> {
    shapes.iter().find_map(|(shape, re)| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            // A blank row is followed by the next row's label, not a value
            .filter(|value| F29Code::from_label(value.as_str()).is_none())
            .filter_map(|value| parse_clp_amount(value.as_str()))
            .find(|v| *v > 0)
            .map(|v| (*shape, v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::DecodingConfig;

    fn document(bytes: &[u8]) -> DecodedDocument {
        DecodedDocument::from_bytes(bytes, &DecodingConfig::default())
    }

    #[test]
    fn test_regex_through_noise() {
        let doc = document(b"538 \x01\x02 Debitos ## 3.410.651 \n563 BASE: 17950795");
        let partial = BinaryPatternStrategy::new().extract(&doc).unwrap();

        assert_eq!(partial.codes.debito_fiscal, Some(3_410_651));
        assert_eq!(partial.codes.ventas_netas, Some(17_950_795));
        assert_eq!(partial.confidence, 40);
        assert!(partial.detected_values[0].contains("regex/grouped"));
        assert!(partial.detected_values[1].contains("regex/bare"));
    }

    #[test]
    fn test_label_inside_number_is_ignored_by_regex() {
        // "1538" is not code 538; only the proximity fallback can pick it up
        let doc = document(b"ref 1538 x 250");
        let partial = BinaryPatternStrategy::new().extract(&doc).unwrap();
        assert_eq!(partial.codes.debito_fiscal, Some(250));
        assert!(partial.detected_values[0].contains("proximity"));
        assert_eq!(partial.confidence, 15);
    }

    #[test]
    fn test_blank_row_does_not_take_next_label() {
        let doc = document(b"538 Debitos\n511 Credito 4.188.643\n");
        let partial = BinaryPatternStrategy::new().extract(&doc).unwrap();

        assert_eq!(partial.codes.debito_fiscal, None);
        assert_eq!(partial.codes.credito_fiscal, Some(4_188_643));
        assert_eq!(partial.confidence, 20);
    }

    #[test]
    fn test_proximity_stops_at_next_label() {
        let strategy = BinaryPatternStrategy::new();
        assert_eq!(strategy.proximity_value("062 PPM\n077 Remanente 120.000", "062"), None);
        assert_eq!(strategy.proximity_value("062 PPM 45.000 077 120.000", "062"), Some(45_000));
    }

    #[test]
    fn test_uncompilable_gap_fails_locally() {
        let config = ExtractionConfig {
            label_gap: 1_000_000,
            ..ExtractionConfig::default()
        };
        let strategy = BinaryPatternStrategy::from_config(&config);
        let err = strategy.extract(&document(b"538 1.000.000")).unwrap_err();
        assert!(matches!(err, ExtractionError::Strategy { .. }));
    }

    #[test]
    fn test_proximity_prefers_large_tokens() {
        let strategy = BinaryPatternStrategy::new();
        let text = format!("077{}12 y 45 luego 1.250.000", "\u{1}".repeat(60));
        assert_eq!(strategy.proximity_value(&text, "077"), Some(1_250_000));
        assert_eq!(strategy.proximity_value("062 7 8", "062"), Some(7));
        assert_eq!(strategy.proximity_value("062 sin valor", "062"), None);
    }

    #[test]
    fn test_proximity_window_limit() {
        let strategy = BinaryPatternStrategy::new();
        let text = format!("511{}4188643", "x".repeat(120));
        assert_eq!(strategy.proximity_value(&text, "511"), None);
    }

    #[test]
    fn test_no_codes() {
        let doc = document(b"nothing to see here");
        let partial = BinaryPatternStrategy::new().extract(&doc).unwrap();
        assert_eq!(partial.confidence, 0);
        assert!(partial.detected_values.is_empty());
    }
}
