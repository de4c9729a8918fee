//! Scoring accumulator threaded through each strategy.

use tracing::trace;

use crate::models::f29::{
    ExtractedCodes, ExtractionMethod, ExtractionResult, F29Code, IdentityField, IdentityFields,
};

/// Kinds of evidence a strategy can report, with their confidence weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Code label followed by a number within the label gap.
    RegexMatch,
    /// Number found in the window after a bare code label.
    ProximityMatch,
    /// Number on a labelled line inside the plausible range.
    VisualMatch,
    /// Exact byte sequence of a known value.
    FingerprintMatch,
    /// Identity field next to its label.
    LabeledIdentity,
    /// Identity field recognised by shape only.
    LooseIdentity,
    /// Folio or company name.
    SecondaryIdentity,
}

impl Signal {
    pub fn weight(&self) -> u32 {
        match self {
            Signal::RegexMatch => 20,
            Signal::ProximityMatch => 15,
            Signal::VisualMatch => 25,
            Signal::FingerprintMatch => 30,
            Signal::LabeledIdentity => 10,
            Signal::LooseIdentity => 5,
            Signal::SecondaryIdentity => 5,
        }
    }
}

/// What one strategy recovered.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialExtraction {
    pub method: ExtractionMethod,
    pub codes: ExtractedCodes,
    pub identity: IdentityFields,
    /// Sum of signal weights, clamped to 100.
    pub confidence: u32,
    pub detected_values: Vec<String>,
}

impl PartialExtraction {
    /// Number of fields this strategy set.
    pub fn fields_found(&self) -> usize {
        self.codes.present_count() + self.identity.present_count()
    }
}

impl From<PartialExtraction> for ExtractionResult {
    fn from(partial: PartialExtraction) -> Self {
        Self {
            codes: partial.codes,
            identity: partial.identity,
            confidence: partial.confidence,
            detected_values: partial.detected_values,
            ..ExtractionResult::new(partial.method)
        }
    }
}

/// Builder for a [`PartialExtraction`]. The first value recorded for a field wins.
#[derive(Debug)]
pub struct ExtractionAccumulator {
    method: ExtractionMethod,
    codes: ExtractedCodes,
    identity: IdentityFields,
    score: u32,
    detected_values: Vec<String>,
}

impl ExtractionAccumulator {
    pub fn new(method: ExtractionMethod) -> Self {
        Self {
            method,
            codes: ExtractedCodes::default(),
            identity: IdentityFields::default(),
            score: 0,
            detected_values: Vec::new(),
        }
    }

    /// Record a code value. Returns `false` when the code was already set or the value is zero.
    pub fn record_code(
        &mut self,
        code: F29Code,
        value: u64,
        signal: Signal,
        provenance: impl Into<String>,
    ) -> bool {
        if self.codes.is_set(code) || value == 0 {
            return false;
        }

        self.codes.set(code, value);
        self.push(signal, provenance.into());
        true
    }

    /// Record an identity field. Returns `false` when the field was already set or the value is blank.
    pub fn record_identity(
        &mut self,
        field: IdentityField,
        value: impl Into<String>,
        signal: Signal,
        provenance: impl Into<String>,
    ) -> bool {
        let value = value.into();
        if self.identity.is_set(field) || value.trim().is_empty() {
            return false;
        }

        self.identity.set(field, value);
        self.push(signal, provenance.into());
        true
    }

    pub fn has_code(&self, code: F29Code) -> bool {
        self.codes.is_set(code)
    }

    pub fn has_identity(&self, field: IdentityField) -> bool {
        self.identity.is_set(field)
    }

    /// Whether every code has been found.
    pub fn codes_complete(&self) -> bool {
        self.codes.present_count() == F29Code::ALL.len()
    }

    pub fn finish(self) -> PartialExtraction {
        PartialExtraction {
            method: self.method,
            codes: self.codes,
            identity: self.identity,
            confidence: self.score.min(100),
            detected_values: self.detected_values,
        }
    }

    fn push(&mut self, signal: Signal, provenance: String) {
        self.score += signal.weight();
        trace!(method = %self.method, ?signal, "{}", provenance);
        self.detected_values.push(provenance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_value_wins() {
        let mut acc = ExtractionAccumulator::new(ExtractionMethod::BinaryRegex);
        assert!(acc.record_code(F29Code::DebitoFiscal, 3_410_651, Signal::RegexMatch, "538 (a)"));
        assert!(!acc.record_code(F29Code::DebitoFiscal, 999, Signal::RegexMatch, "538 (b)"));

        let partial = acc.finish();
        assert_eq!(partial.codes.debito_fiscal, Some(3_410_651));
        assert_eq!(partial.confidence, 20);
        assert_eq!(partial.detected_values, vec!["538 (a)"]);
    }

    #[test]
    fn test_zero_and_blank_ignored() {
        let mut acc = ExtractionAccumulator::new(ExtractionMethod::Identity);
        assert!(!acc.record_code(F29Code::Ppm, 0, Signal::ProximityMatch, "062"));
        assert!(!acc.record_identity(IdentityField::Folio, "  ", Signal::LooseIdentity, "folio"));
        assert_eq!(acc.finish().confidence, 0);
    }

    #[test]
    fn test_weights_accumulate_and_clamp() {
        let mut acc = ExtractionAccumulator::new(ExtractionMethod::Fingerprint);
        for code in F29Code::ALL {
            acc.record_code(code, 1_000_000, Signal::FingerprintMatch, code.label());
        }
        assert!(acc.codes_complete());
        let partial = acc.finish();
        assert_eq!(partial.confidence, 100);
        assert_eq!(partial.fields_found(), 5);
    }

    #[test]
    fn test_identity_weights() {
        let mut acc = ExtractionAccumulator::new(ExtractionMethod::Identity);
        acc.record_identity(IdentityField::Rut, "76086428-5", Signal::LabeledIdentity, "rut");
        acc.record_identity(IdentityField::Folio, "8812345", Signal::LooseIdentity, "folio");
        assert!(acc.has_identity(IdentityField::Rut));
        assert_eq!(acc.finish().confidence, 15);
    }
}
