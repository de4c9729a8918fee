//! Rule-based field extractors for F29 documents.

pub mod amounts;
pub mod patterns;
pub mod period;
pub mod rut;

pub use amounts::{format_clp_amount, numeric_tokens, parse_clp_amount, AmountExtractor};
pub use period::{normalize_period, period_date, PeriodExtractor};
pub use rut::{format_rut, normalize_rut, rut_length, validate_rut, RutExtractor};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Byte position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    /// Whether the match came from a labelled pattern.
    pub fn is_labeled(&self) -> bool {
        self.confidence >= 0.9
    }
}

/// Upper-case and strip Spanish accents so `Débitos` matches `DEBITOS`.
pub fn fold_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'Á' | 'à' | 'À' => 'A',
            'é' | 'É' | 'è' | 'È' => 'E',
            'í' | 'Í' | 'ì' | 'Ì' => 'I',
            'ó' | 'Ó' | 'ò' | 'Ò' => 'O',
            'ú' | 'Ú' | 'ù' | 'Ù' | 'ü' | 'Ü' => 'U',
            'ñ' | 'Ñ' => 'N',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_accents() {
        assert_eq!(fold_accents("Débitos y Crédito"), "DEBITOS Y CREDITO");
        assert_eq!(fold_accents("Año 2024"), "ANO 2024");
    }

    #[test]
    fn test_match_is_labeled() {
        assert!(ExtractionMatch::new(1, 0.95, "RUT: 1").is_labeled());
        assert!(!ExtractionMatch::new(1, 0.7, "1").is_labeled());
    }
}
