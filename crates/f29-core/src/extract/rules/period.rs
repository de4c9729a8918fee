//! Tax period (`YYYYMM`) extraction.

use chrono::{Datelike, NaiveDate};

use super::patterns::{PERIOD_LABELED, PERIOD_SPLIT, PERIOD_STANDALONE};
use super::{ExtractionMatch, FieldExtractor};

/// Period extractor.
pub struct PeriodExtractor;

impl PeriodExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PeriodExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for PeriodExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();

        for caps in PERIOD_LABELED.captures_iter(text) {
            if let (Some(full), Some(period)) = (caps.get(0), normalize_period(&caps[1])) {
                results.push(
                    ExtractionMatch::new(period, 0.95, full.as_str())
                        .with_position(full.start(), full.end()),
                );
            }
        }

        for caps in PERIOD_STANDALONE.captures_iter(text) {
            let Some(token) = caps.get(1) else { continue };
            let Some(period) = normalize_period(token.as_str()) else {
                continue;
            };
            if results.iter().any(|r| r.value == period) {
                continue;
            }
            results.push(
                ExtractionMatch::new(period, 0.6, token.as_str())
                    .with_position(token.start(), token.end()),
            );
        }

        results
    }
}

/// Normalize `202403`, `03/2024`, `3-2024` or `2024-03` to `202403`.
pub fn normalize_period(raw: &str) -> Option<String> {
    let raw = raw.trim();

    let (year, month) = if raw.len() == 6 && raw.chars().all(|c| c.is_ascii_digit()) {
        (raw[..4].parse::<i32>().ok()?, raw[4..].parse::<u32>().ok()?)
    } else {
        let caps = PERIOD_SPLIT.captures(raw)?;
        let (a, b) = (&caps[1], &caps[2]);
        match (a.len(), b.len()) {
            (4, 1..=2) => (a.parse().ok()?, b.parse().ok()?),
            (1..=2, 4) => (b.parse().ok()?, a.parse().ok()?),
            _ => return None,
        }
    };

    if !(1990..=2100).contains(&year) {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(year, month, 1)?;
    Some(format!("{:04}{:02}", date.year(), date.month()))
}

/// First day of a `YYYYMM` period.
pub fn period_date(period: &str) -> Option<NaiveDate> {
    let normalized = normalize_period(period)?;
    let year = normalized[..4].parse().ok()?;
    let month = normalized[4..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_period() {
        assert_eq!(normalize_period("202403"), Some("202403".to_string()));
        assert_eq!(normalize_period("03/2024"), Some("202403".to_string()));
        assert_eq!(normalize_period("3-2024"), Some("202403".to_string()));
        assert_eq!(normalize_period("2024-11"), Some("202411".to_string()));
        assert_eq!(normalize_period("202413"), None);
        assert_eq!(normalize_period("13/2024"), None);
        assert_eq!(normalize_period("hello"), None);
    }

    #[test]
    fn test_extract_labeled_period() {
        let text = "FOLIO 8812345\nPERIODO TRIBUTARIO: 03/2024\n";
        let found = PeriodExtractor::new().extract(text).unwrap();
        assert_eq!(found.value, "202403");
        assert!(found.is_labeled());
    }

    #[test]
    fn test_extract_standalone_period() {
        let found = PeriodExtractor::new().extract("F29 202405 RUT").unwrap();
        assert_eq!(found.value, "202405");
        assert!(!found.is_labeled());
        assert!(PeriodExtractor::new().extract("3410651").is_none());
    }

    #[test]
    fn test_period_date() {
        assert_eq!(period_date("202402"), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(period_date("2024"), None);
    }
}
