//! CLP amount parsing. Pesos have no cents; a trailing `,dd` is dropped.

use super::patterns::NUMBER_TOKEN;
use super::{ExtractionMatch, FieldExtractor};

/// Numeric token extractor.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<u64>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        NUMBER_TOKEN
            .find_iter(text)
            .filter_map(|m| {
                let value = parse_clp_amount(m.as_str())?;
                let confidence = if m.as_str().contains('.') { 0.9 } else { 0.7 };
                Some(
                    ExtractionMatch::new(value, confidence, m.as_str())
                        .with_position(m.start(), m.end()),
                )
            })
            .collect()
    }
}

/// All numeric tokens in a text, in order of appearance.
pub fn numeric_tokens(text: &str) -> Vec<u64> {
    AmountExtractor::new()
        .extract_all(text)
        .into_iter()
        .map(|m| m.value)
        .collect()
}

/// Parse a Chilean-formatted amount (e.g. "$ 3.410.651" or "3410651,00").
pub fn parse_clp_amount(s: &str) -> Option<u64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    // Comma is the decimal separator; pesos never carry cents
    let integer_part = match cleaned.rfind(',') {
        Some(pos) if cleaned.len() - pos <= 3 => &cleaned[..pos],
        _ => cleaned.as_str(),
    };

    let digits: String = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    digits.parse().ok()
}

/// Format an amount in Chilean style ($3.410.651, -$777.992).
pub fn format_clp_amount(amount: impl Into<i128>) -> String {
    let amount: i128 = amount.into();
    let digits = amount.unsigned_abs().to_string();
    let chars: Vec<char> = digits.chars().collect();
    let mut formatted = String::new();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    if amount < 0 {
        format!("-${}", formatted)
    } else {
        format!("${}", formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clp_amount() {
        assert_eq!(parse_clp_amount("3.410.651"), Some(3_410_651));
        assert_eq!(parse_clp_amount("$ 17.950.795"), Some(17_950_795));
        assert_eq!(parse_clp_amount("4188643"), Some(4_188_643));
        assert_eq!(parse_clp_amount("1.234,56"), Some(1_234));
        assert_eq!(parse_clp_amount("1,234,567"), Some(1_234_567));
        assert_eq!(parse_clp_amount("abc"), None);
    }

    #[test]
    fn test_format_clp_amount() {
        assert_eq!(format_clp_amount(3_410_651), "$3.410.651");
        assert_eq!(format_clp_amount(-777_992), "-$777.992");
        assert_eq!(format_clp_amount(950), "$950");
        assert_eq!(format_clp_amount(0), "$0");
        assert_eq!(format_clp_amount(u64::MAX), "$18.446.744.073.709.551.615");
    }

    #[test]
    fn test_numeric_tokens() {
        let tokens = numeric_tokens("538 DEBITOS 3.410.651 y 4188643, 12");
        assert_eq!(tokens, vec![538, 3_410_651, 4_188_643, 12]);
    }

    #[test]
    fn test_extract_positions() {
        let matches = AmountExtractor::new().extract_all("x 1.000 y");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].position, Some((2, 7)));
        assert_eq!(matches[0].source, "1.000");
    }
}
