//! RUT (Chilean tax ID) extraction and validation.

use super::patterns::{RUT_LABELED, RUT_STANDALONE};
use super::{ExtractionMatch, FieldExtractor};

/// Accepted RUT length after stripping separators.
const RUT_LEN: std::ops::RangeInclusive<usize> = 8..=12;

/// RUT field extractor.
pub struct RutExtractor {
    validate: bool,
}

impl RutExtractor {
    /// Create a new RUT extractor.
    pub fn new() -> Self {
        Self { validate: true }
    }

    /// Set whether candidates with a valid check digit are preferred.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

impl Default for RutExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for RutExtractor {
    type Output = ExtractionMatch<String>;

    /// Labelled candidates win over loose ones; within each group a valid
    /// check digit wins when validation is on.
    fn extract(&self, text: &str) -> Option<Self::Output> {
        let (labeled, loose): (Vec<_>, Vec<_>) =
            self.extract_all(text).into_iter().partition(|m| m.is_labeled());

        [labeled, loose].into_iter().find_map(|group| {
            if self.validate {
                if let Some(valid) = group.iter().find(|m| validate_rut(&m.value)) {
                    return Some(valid.clone());
                }
            }
            group.into_iter().next()
        })
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();

        // Labeled pattern first (higher confidence)
        for caps in RUT_LABELED.captures_iter(text) {
            let rut = normalize_rut(&format!("{}-{}", &caps[1], &caps[2]));
            if !RUT_LEN.contains(&rut_length(&rut)) {
                continue;
            }
            let Some(full_match) = caps.get(0) else { continue };
            let confidence = if validate_rut(&rut) { 0.95 } else { 0.9 };
            results.push(
                ExtractionMatch::new(rut, confidence, full_match.as_str())
                    .with_position(full_match.start(), full_match.end()),
            );
        }

        for caps in RUT_STANDALONE.captures_iter(text) {
            let rut = normalize_rut(&format!("{}-{}", &caps[1], &caps[2]));

            // Skip if already found with labeled pattern
            if results.iter().any(|r| r.value == rut) || !RUT_LEN.contains(&rut_length(&rut)) {
                continue;
            }

            let Some(full_match) = caps.get(0) else { continue };
            let confidence = if validate_rut(&rut) { 0.7 } else { 0.6 };
            results.push(
                ExtractionMatch::new(rut, confidence, full_match.as_str().trim())
                    .with_position(full_match.start(), full_match.end()),
            );
        }

        results
    }
}

/// Strip separators: `12.345.678-5` becomes `12345678-5`.
pub fn normalize_rut(rut: &str) -> String {
    let compact: String = rut
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if compact.len() < 2 {
        return compact;
    }

    let (body, dv) = compact.split_at(compact.len() - 1);
    format!("{}-{}", body, dv)
}

/// Length of a RUT without dots, dashes or spaces.
pub fn rut_length(rut: &str) -> usize {
    rut.chars().filter(|c| c.is_ascii_alphanumeric()).count()
}

/// Validate a RUT using the modulo-11 check digit.
///
/// Body digits are weighted 2, 3, 4, 5, 6, 7 (repeating) from the right;
/// the check digit is `11 - sum % 11`, with 11 written as 0 and 10 as K.
pub fn validate_rut(rut: &str) -> bool {
    let compact: Vec<char> = rut
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let Some((dv, body)) = compact.split_last() else {
        return false;
    };

    if body.len() < 7 || body.len() > 8 || !body.iter().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = body
        .iter()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .zip([2, 3, 4, 5, 6, 7].into_iter().cycle())
        .map(|(d, w)| d * w)
        .sum();

    let expected = match 11 - sum % 11 {
        11 => '0',
        10 => 'K',
        n => char::from_digit(n, 10).unwrap_or('?'),
    };

    *dv == expected
}

/// Format RUT with dots and dash (12.345.678-5).
pub fn format_rut(rut: &str) -> String {
    let normalized = normalize_rut(rut);
    let Some((body, dv)) = normalized.split_once('-') else {
        return rut.to_string();
    };

    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit()) {
        return rut.to_string();
    }

    let chars: Vec<char> = body.chars().collect();
    let mut grouped = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    format!("{}-{}", grouped, dv)
}

/// Extract RUT from text.
pub fn extract_rut(text: &str) -> Option<String> {
    RutExtractor::new().extract(text).map(|m| m.value)
}
