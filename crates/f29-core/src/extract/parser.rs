//! Orchestrator combining every extraction strategy with derivation and validation.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::decode::DecodedDocument;
use crate::error::ExtractionError;
use crate::models::config::F29Config;
use crate::models::f29::{
    DerivedFields, ExtractionMethod, ExtractionResult, F29Code, IdentityField,
};
use crate::validation::{ValidationResult, Validator};

use super::derived::{auto_correct, coherence_ratio};
use super::strategies::{
    BinaryPatternStrategy, FingerprintCache, FingerprintStrategy, IdentityStrategy,
    VisualStrategy,
};
use super::{ExtractionStrategy, PartialExtraction};

/// Wall-clock timer; reads zero on wasm32 where `Instant` is unavailable.
struct Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    started: std::time::Instant,
}

impl Stopwatch {
    fn start() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            started: std::time::Instant::now(),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    #[cfg(target_arch = "wasm32")]
    fn elapsed_ms(&self) -> u64 {
        0
    }
}

/// What one strategy contributed to a parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyReport {
    pub method: ExtractionMethod,
    pub confidence: u32,
    pub fields_found: usize,
    /// Set when the strategy failed; it then contributed nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full outcome of parsing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseReport {
    pub result: ExtractionResult,
    pub validation: ValidationResult,
    pub strategies: Vec<StrategyReport>,
    pub processing_time_ms: u64,
}

/// Runs the strategies, merges their output, derives totals and validates.
pub struct SuperParser {
    config: F29Config,
    binary: BinaryPatternStrategy,
    visual: VisualStrategy,
    identity: IdentityStrategy,
    fingerprints: FingerprintCache,
    validator: Validator,
}

impl SuperParser {
    /// Parser with default configuration and the reference fingerprints.
    pub fn new() -> Self {
        Self::from_config(F29Config::default())
    }

    pub fn from_config(config: F29Config) -> Self {
        Self {
            binary: BinaryPatternStrategy::from_config(&config.extraction),
            visual: VisualStrategy::from_config(&config.extraction),
            identity: IdentityStrategy::new(),
            fingerprints: FingerprintCache::with_reference(),
            validator: Validator::new(config.validation.clone()),
            config,
        }
    }

    /// Replace the fingerprint cache.
    pub fn with_fingerprints(mut self, fingerprints: FingerprintCache) -> Self {
        self.fingerprints = fingerprints;
        self
    }

    pub fn config(&self) -> &F29Config {
        &self.config
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn fingerprints(&self) -> &FingerprintCache {
        &self.fingerprints
    }

    pub fn fingerprints_mut(&mut self) -> &mut FingerprintCache {
        &mut self.fingerprints
    }

    /// Learn the codes of a valid report whose confidence reaches the configured minimum.
    pub fn learn(&mut self, report: &ParseReport) -> usize {
        if report.result.confidence < self.config.fingerprints.learn_min_confidence {
            debug!(
                "Not learning: confidence {} below {}",
                report.result.confidence, self.config.fingerprints.learn_min_confidence
            );
            return 0;
        }
        self.fingerprints.learn(&report.result)
    }

    /// Parse a document.
    ///
    /// Fails only when no strategy recognised anything. Validation problems
    /// are returned in the report.
    pub fn parse(&self, bytes: &[u8]) -> crate::Result<ParseReport> {
        let start = Stopwatch::start();
        info!("Parsing F29 from {} bytes", bytes.len());

        let document = DecodedDocument::from_bytes(bytes, &self.config.decoding);

        let fingerprint = FingerprintStrategy::new(&self.fingerprints);
        let mut strategies: Vec<&dyn ExtractionStrategy> = vec![&self.binary];
        if self.config.extraction.enable_visual {
            strategies.push(&self.visual);
        }
        if self.config.extraction.enable_fingerprint {
            strategies.push(&fingerprint);
        }
        strategies.push(&self.identity);

        let mut reports = Vec::with_capacity(strategies.len());
        let mut partials = Vec::new();

        for strategy in &strategies {
            match strategy.extract(&document) {
                Ok(partial) => {
                    debug!(
                        "Strategy {}: confidence {}, {} fields",
                        partial.method,
                        partial.confidence,
                        partial.fields_found()
                    );
                    reports.push(StrategyReport {
                        method: partial.method,
                        confidence: partial.confidence,
                        fields_found: partial.fields_found(),
                        error: None,
                    });
                    if partial.confidence > 0 {
                        partials.push(partial);
                    }
                }
                Err(e) => {
                    warn!("Strategy {} failed: {}", strategy.method(), e);
                    reports.push(StrategyReport {
                        method: strategy.method(),
                        confidence: 0,
                        fields_found: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if partials.is_empty() {
            return Err(ExtractionError::NoSignal {
                strategies: strategies.len(),
            }
            .into());
        }

        let vat_rate = self.config.validation.vat_rate;
        let mut result = merge_partials(partials);
        result.derived = DerivedFields::compute_with_rate(&result.codes, vat_rate);
        self.apply_coherence_bonus(&mut result);

        let mut validation = self.validator.validate(&result);
        if !validation.is_valid && self.config.extraction.auto_correct {
            auto_correct(&mut result, vat_rate);
            let revalidated = self.validator.validate(&result);
            validation = ValidationResult {
                confidence: validation.confidence.min(revalidated.confidence),
                ..revalidated
            };
        }

        result.confidence = result.confidence.min(validation.confidence);
        result.is_valid = validation.is_valid;

        let processing_time_ms = start.elapsed_ms();
        info!(
            "Parsed F29: {} codes, confidence {}, valid {} ({} ms)",
            result.codes.present_count(),
            result.confidence,
            result.is_valid,
            processing_time_ms
        );

        Ok(ParseReport {
            result,
            validation,
            strategies: reports,
            processing_time_ms,
        })
    }

    /// Reward results whose débito matches the ventas base at the VAT rate.
    fn apply_coherence_bonus(&self, result: &mut ExtractionResult) {
        let (Some(debito), Some(ventas)) = (
            result.codes.present(F29Code::DebitoFiscal),
            result.codes.present(F29Code::VentasNetas),
        ) else {
            return;
        };
        let Some(ratio) = coherence_ratio(debito, ventas, self.config.validation.vat_rate) else {
            return;
        };

        let tier = self
            .config
            .extraction
            .coherence_bonus
            .iter()
            .find(|t| ratio < t.max_error);

        if let Some(tier) = tier {
            result.add_confidence(tier.bonus);
            result.detected_values.push(format!(
                "coherence {} ({:.2}% error): +{}",
                tier.label,
                ratio * 100.0,
                tier.bonus
            ));
            debug!("Coherence bonus {} (+{})", tier.label, tier.bonus);
        }
    }
}

impl Default for SuperParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge partial results, highest confidence first.
///
/// A field set by a higher-confidence partial is never overwritten. Provenance
/// is concatenated in merge order and the confidences are summed, clamped to 100.
pub fn merge_partials(mut partials: Vec<PartialExtraction>) -> ExtractionResult {
    partials.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    let mut result = ExtractionResult::new(ExtractionMethod::SuperParser);
    let mut confidence = 0u32;

    for partial in partials {
        for (code, value) in partial.codes.iter() {
            if !result.codes.is_set(code) {
                result.codes.set(code, value);
            }
        }
        for field in IdentityField::ALL {
            if let Some(value) = partial.identity.get(field) {
                if !result.identity.is_set(field) {
                    result.identity.set(field, value);
                }
            }
        }
        confidence += partial.confidence;
        result.detected_values.extend(partial.detected_values);
    }

    result.confidence = confidence.min(100);
    debug!(
        "Merged {} codes and {} identity fields (confidence {})",
        result.codes.present_count(),
        result.identity.present_count(),
        result.confidence
    );
    result
}
