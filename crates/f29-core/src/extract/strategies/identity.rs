//! Taxpayer identity strategy: RUT, period, folio and company name.

use tracing::debug;

use crate::decode::{DecodedDocument, DecodedText};
use crate::extract::rules::patterns::{FOLIO, RAZON_SOCIAL};
use crate::extract::rules::{FieldExtractor, PeriodExtractor, RutExtractor};
use crate::extract::{ExtractionAccumulator, ExtractionStrategy, PartialExtraction, Result, Signal};
use crate::models::f29::{ExtractionMethod, IdentityField};

const RAZON_SOCIAL_MAX_CHARS: usize = 100;

/// Identity strategy.
pub struct IdentityStrategy {
    rut: RutExtractor,
    period: PeriodExtractor,
}

impl IdentityStrategy {
    pub fn new() -> Self {
        Self {
            rut: RutExtractor::new(),
            period: PeriodExtractor::new(),
        }
    }

    fn scan_text(&self, text: &DecodedText, acc: &mut ExtractionAccumulator) {
        if !acc.has_identity(IdentityField::Rut) {
            if let Some(m) = self.rut.extract(&text.text) {
                let signal = if m.is_labeled() {
                    Signal::LabeledIdentity
                } else {
                    Signal::LooseIdentity
                };
                let provenance = format!("rut = {} [{}]", m.value, text.label());
                acc.record_identity(IdentityField::Rut, m.value, signal, provenance);
            }
        }

        if !acc.has_identity(IdentityField::Periodo) {
            if let Some(m) = self.period.extract(&text.text) {
                let signal = if m.is_labeled() {
                    Signal::LabeledIdentity
                } else {
                    Signal::LooseIdentity
                };
                let provenance = format!("periodo = {} [{}]", m.value, text.label());
                acc.record_identity(IdentityField::Periodo, m.value, signal, provenance);
            }
        }

        if !acc.has_identity(IdentityField::Folio) {
            if let Some(folio) = FOLIO.captures(&text.text).and_then(|c| c.get(1)) {
                acc.record_identity(
                    IdentityField::Folio,
                    folio.as_str(),
                    Signal::SecondaryIdentity,
                    format!("folio = {} [{}]", folio.as_str(), text.label()),
                );
            }
        }

        if !acc.has_identity(IdentityField::RazonSocial) {
            let name = RAZON_SOCIAL
                .captures_iter(&text.text)
                .filter_map(|c| clean_razon_social(c.get(1)?.as_str()))
                .next();
            if let Some(name) = name {
                let provenance = format!("razonSocial = {} [{}]", name, text.label());
                acc.record_identity(
                    IdentityField::RazonSocial,
                    name,
                    Signal::SecondaryIdentity,
                    provenance,
                );
            }
        }
    }
}

impl Default for IdentityStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStrategy for IdentityStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Identity
    }

    fn extract(&self, document: &DecodedDocument) -> Result<PartialExtraction> {
        let mut acc = ExtractionAccumulator::new(self.method());

        for text in document.texts() {
            self.scan_text(text, &mut acc);
            if IdentityField::ALL.iter().all(|f| acc.has_identity(*f)) {
                break;
            }
        }

        let partial = acc.finish();
        debug!(
            "Identity strategy found {} fields (confidence {})",
            partial.identity.present_count(),
            partial.confidence
        );
        Ok(partial)
    }
}

/// Keep the printable prefix of a company-name capture, cut at the first column gap.
fn clean_razon_social(raw: &str) -> Option<String> {
    let printable: String = raw
        .chars()
        .take_while(|c| !c.is_control() || *c == '\t')
        .collect();

    let cut = printable
        .find("  ")
        .into_iter()
        .chain(printable.find('\t'))
        .min()
        .unwrap_or(printable.len());

    let name: String = printable[..cut]
        .trim()
        .chars()
        .take(RAZON_SOCIAL_MAX_CHARS)
        .collect();

    (name.chars().filter(|c| c.is_alphabetic()).count() >= 3).then_some(name)
}
