//! Configuration structures for the extraction pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::decode::TextEncoding;
use crate::error::Result;
use crate::models::f29::{CodeRange, F29Code};
use crate::validation::ValidationPolicy;

/// Main configuration for the f29 pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct F29Config {
    /// Byte decoding configuration.
    pub decoding: DecodingConfig,

    /// Strategy configuration.
    pub extraction: ExtractionConfig,

    /// Coherence rules and thresholds.
    pub validation: ValidationPolicy,

    /// Known-document fingerprint cache.
    pub fingerprints: FingerprintConfig,
}

/// Byte decoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingConfig {
    /// Encodings every byte source is decoded under, in order.
    pub encodings: Vec<TextEncoding>,

    /// Also decode the inflated content of compressed PDF streams.
    pub inflate_streams: bool,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            encodings: TextEncoding::ALL.to_vec(),
            inflate_streams: true,
        }
    }
}

/// Strategy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum non-digit characters between a code label and its value.
    pub label_gap: usize,

    /// Characters scanned after a bare code label in proximity search.
    pub proximity_window: usize,

    /// Proximity search prefers the first token above this value.
    pub proximity_min_value: u64,

    /// Run the line-adjacency strategy.
    pub enable_visual: bool,

    /// Run the fingerprint strategy.
    pub enable_fingerprint: bool,

    /// Plausible magnitudes accepted by the line-adjacency strategy.
    pub visual_ranges: BTreeMap<F29Code, CodeRange>,

    /// Bonus tiers for the débito / ventas coherence pass.
    pub coherence_bonus: Vec<BonusTier>,

    /// Recompute derived fields and re-validate when validation fails.
    pub auto_correct: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            label_gap: 50,
            proximity_window: 100,
            proximity_min_value: 100,
            enable_visual: true,
            enable_fingerprint: true,
            visual_ranges: default_visual_ranges(),
            coherence_bonus: default_bonus_tiers(),
            auto_correct: true,
        }
    }
}

fn default_visual_ranges() -> BTreeMap<F29Code, CodeRange> {
    BTreeMap::from([
        (F29Code::DebitoFiscal, CodeRange::new(1_000_000, 10_000_000)),
        (F29Code::CreditoFiscal, CodeRange::new(1_000_000, 20_000_000)),
        (F29Code::Ppm, CodeRange::new(10_000, 1_000_000)),
        (F29Code::Remanente, CodeRange::new(10_000, 50_000_000)),
        (F29Code::VentasNetas, CodeRange::new(5_000_000, 100_000_000)),
    ])
}

/// A coherence bonus tier: relative error strictly below `max_error` earns `bonus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusTier {
    pub label: String,
    pub max_error: f64,
    pub bonus: u32,
}

fn default_bonus_tiers() -> Vec<BonusTier> {
    [("excellent", 0.10, 15), ("good", 0.20, 10), ("acceptable", 0.30, 5)]
        .into_iter()
        .map(|(label, max_error, bonus)| BonusTier {
            label: label.to_string(),
            max_error,
            bonus,
        })
        .collect()
}

/// Known-document fingerprint cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// JSON file the cache is loaded from and saved to.
    pub cache_path: Option<PathBuf>,

    /// Only valid results at or above this confidence are learned.
    pub learn_min_confidence: u32,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            cache_path: None,
            learn_min_confidence: 70,
        }
    }
}

impl F29Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
