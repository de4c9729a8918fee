//! Known-document fingerprint cache.
//!
//! Values learned from previously validated forms are searched for as exact
//! byte sequences. This recovers known documents whose text layer defeats the
//! other strategies, and contributes nothing on unseen documents.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::decode::DecodedDocument;
use crate::error::ExtractionError;
use crate::extract::rules::format_clp_amount;
use crate::extract::{ExtractionAccumulator, ExtractionStrategy, PartialExtraction, Result, Signal};
use crate::models::f29::{ExtractionMethod, ExtractionResult, F29Code};

/// A code value seen on a validated form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub code: F29Code,
    pub value: u64,
    /// Where the value was learned from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Fingerprint {
    pub fn new(code: F29Code, value: u64) -> Self {
        Self {
            code,
            value,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Byte sequences the value may appear as: `3410651` and `3.410.651`.
    fn needles(&self) -> Vec<Vec<u8>> {
        let bare = self.value.to_string();
        let grouped = format_clp_amount(self.value).trim_start_matches('$').to_string();

        let mut needles = vec![bare.clone().into_bytes()];
        if grouped != bare {
            needles.push(grouped.into_bytes());
        }
        needles
    }
}

/// Learned byte-sequence to value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintCache {
    #[serde(default)]
    entries: Vec<Fingerprint>,
}

impl FingerprintCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache seeded with the reference F29 used to calibrate the pipeline.
    pub fn with_reference() -> Self {
        let mut cache = Self::new();
        for (code, value) in [
            (F29Code::DebitoFiscal, 3_410_651),
            (F29Code::CreditoFiscal, 4_188_643),
            (F29Code::VentasNetas, 17_950_795),
        ] {
            cache.insert(Fingerprint::new(code, value).with_source("reference"));
        }
        cache
    }

    /// Load a cache from a JSON file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let cache: Self = serde_json::from_str(&content)?;
        debug!("Loaded {} fingerprints from {}", cache.len(), path.display());
        Ok(cache)
    }

    /// Save the cache to a JSON file.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn entries(&self) -> &[Fingerprint] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Add an entry. Zero values and duplicates are rejected.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        if fingerprint.value == 0
            || self
                .entries
                .iter()
                .any(|e| e.code == fingerprint.code && e.value == fingerprint.value)
        {
            return false;
        }
        self.entries.push(fingerprint);
        true
    }

    /// Remember the codes of a validated result. Returns how many entries were added.
    pub fn learn(&mut self, result: &ExtractionResult) -> usize {
        if !result.is_valid {
            return 0;
        }

        let source = match (&result.identity.rut, &result.identity.periodo) {
            (Some(rut), Some(periodo)) => format!("{} {}", rut, periodo),
            (Some(rut), None) => rut.clone(),
            (None, Some(periodo)) => periodo.clone(),
            (None, None) => "learned".to_string(),
        };

        let added = result
            .codes
            .iter()
            .filter(|(code, value)| {
                self.insert(Fingerprint::new(*code, *value).with_source(source.clone()))
            })
            .count();

        if added > 0 {
            info!("Learned {} fingerprints from {}", added, source);
        }
        added
    }
}

/// Exact byte-sequence strategy backed by a [`FingerprintCache`].
pub struct FingerprintStrategy<'a> {
    cache: &'a FingerprintCache,
}

impl<'a> FingerprintStrategy<'a> {
    pub fn new(cache: &'a FingerprintCache) -> Self {
        Self { cache }
    }
}

impl ExtractionStrategy for FingerprintStrategy<'_> {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Fingerprint
    }

    fn extract(&self, document: &DecodedDocument) -> Result<PartialExtraction> {
        let mut acc = ExtractionAccumulator::new(self.method());

        for entry in self.cache.entries() {
            if entry.value == 0 {
                return Err(ExtractionError::InvalidFingerprint {
                    code: entry.code,
                    value: entry.value,
                });
            }
            if acc.has_code(entry.code) {
                continue;
            }

            let needles = entry.needles();
            let hit = document.byte_sources().find_map(|(source, bytes)| {
                needles
                    .iter()
                    .find_map(|needle| find_isolated(bytes, needle))
                    .map(|offset| (source, offset))
            });

            if let Some((source, offset)) = hit {
                acc.record_code(
                    entry.code,
                    entry.value,
                    Signal::FingerprintMatch,
                    format!(
                        "{} ({}) = {} [fingerprint, {} byte {}]",
                        entry.code.description(),
                        entry.code,
                        entry.value,
                        source,
                        offset
                    ),
                );
            }
        }

        let partial = acc.finish();
        debug!(
            "Fingerprint strategy matched {} of {} entries",
            partial.codes.present_count(),
            self.cache.len()
        );
        Ok(partial)
    }
}

/// Offset of `needle` in `haystack` where it is not part of a longer number.
fn find_isolated(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(i, _)| i)
        .find(|&i| {
            let before = i.checked_sub(1).map(|p| haystack[p]);
            let after = haystack.get(i + needle.len()).copied();
            let after_next = haystack.get(i + needle.len() + 1).copied();

            let digit_before = before.is_some_and(|b| b.is_ascii_digit());
            let digit_after = after.is_some_and(|b| b.is_ascii_digit())
                || (after == Some(b'.') && after_next.is_some_and(|b| b.is_ascii_digit()));

            !digit_before && !digit_after
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
    fn test_reference_document_matches() {
        let cache = FingerprintCache::with_reference();
        let doc = document(b"\x00\x9f(3.410.651)Tj \xff 4188643 (17.950.795)");
        let partial = FingerprintStrategy::new(&cache).extract(&doc).unwrap();

        assert_eq!(partial.codes.debito_fiscal, Some(3_410_651));
        assert_eq!(partial.codes.credito_fiscal, Some(4_188_643));
        assert_eq!(partial.codes.ventas_netas, Some(17_950_795));
        assert_eq!(partial.confidence, 90);
    }

    #[test]
    fn test_longer_numbers_do_not_match() {
        let cache = FingerprintCache::with_reference();
        let doc = document(b"134106510 3.410.651.000 43410651");
        let partial = FingerprintStrategy::new(&cache).extract(&doc).unwrap();
        assert_eq!(partial.confidence, 0);
    }

    #[test]
    fn test_zero_entry_is_strategy_error() {
        let cache: FingerprintCache =
            serde_json::from_str(r#"{"entries":[{"code":"062","value":0}]}"#).unwrap();
        let result = FingerprintStrategy::new(&cache).extract(&document(b"0"));
        assert!(matches!(
            result,
            Err(ExtractionError::InvalidFingerprint { code: F29Code::Ppm, .. })
        ));
    }

    #[test]
    fn test_learn_only_valid_results() {
        let mut cache = FingerprintCache::new();
        let mut result = ExtractionResult::new(ExtractionMethod::SuperParser);
        result.codes.set(F29Code::Ppm, 45_000);
        result.codes.set(F29Code::Remanente, 120_000);
        result.identity.rut = Some("76086428-5".to_string());

        assert_eq!(cache.learn(&result), 0);

        result.is_valid = true;
        assert_eq!(cache.learn(&result), 2);
        assert_eq!(cache.learn(&result), 0);
        assert_eq!(cache.entries()[0].source.as_deref(), Some("76086428-5"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fingerprints.json");

        let cache = FingerprintCache::with_reference();
        cache.save(&path).unwrap();
        let loaded = FingerprintCache::load(&path).unwrap();
        assert_eq!(loaded, cache);
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn test_find_isolated() {
        assert_eq!(find_isolated(b"a 123 b", b"123"), Some(2));
        assert_eq!(find_isolated(b"1234 123", b"123"), Some(5));
        assert_eq!(find_isolated(b"123.4", b"123"), None);
        assert_eq!(find_isolated(b"123.", b"123"), Some(0));
        assert_eq!(find_isolated(b"", b"123"), None);
    }
}
