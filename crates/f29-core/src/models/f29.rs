//! F29 form data models.
//!
//! Field names follow the SII form vocabulary (débito fiscal, crédito fiscal,
//! PPM, remanente, ventas netas) and serialize in camelCase for the web layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the five F29 lines recovered by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum F29Code {
    /// Code 538: total output VAT.
    #[serde(rename = "538")]
    DebitoFiscal,

    /// Code 511: total input VAT credit.
    #[serde(rename = "511")]
    CreditoFiscal,

    /// Code 062: monthly provisional income-tax payment.
    #[serde(rename = "062")]
    Ppm,

    /// Code 077: VAT credit carried forward.
    #[serde(rename = "077")]
    Remanente,

    /// Code 563: net monthly sales.
    #[serde(rename = "563")]
    VentasNetas,
}

impl F29Code {
    /// All codes, in extraction order.
    pub const ALL: [F29Code; 5] = [
        F29Code::DebitoFiscal,
        F29Code::CreditoFiscal,
        F29Code::Ppm,
        F29Code::Remanente,
        F29Code::VentasNetas,
    ];

    /// The number printed on the form next to the value.
    pub fn label(&self) -> &'static str {
        match self {
            F29Code::DebitoFiscal => "538",
            F29Code::CreditoFiscal => "511",
            F29Code::Ppm => "062",
            F29Code::Remanente => "077",
            F29Code::VentasNetas => "563",
        }
    }

    /// Wire name of the field holding this code.
    pub fn field_name(&self) -> &'static str {
        match self {
            F29Code::DebitoFiscal => "debitoFiscal",
            F29Code::CreditoFiscal => "creditoFiscal",
            F29Code::Ppm => "ppm",
            F29Code::Remanente => "remanente",
            F29Code::VentasNetas => "ventasNetas",
        }
    }

    /// Human readable name.
    pub fn description(&self) -> &'static str {
        match self {
            F29Code::DebitoFiscal => "débito fiscal",
            F29Code::CreditoFiscal => "crédito fiscal",
            F29Code::Ppm => "PPM",
            F29Code::Remanente => "remanente",
            F29Code::VentasNetas => "ventas netas",
        }
    }

    /// Label keywords printed on the same row, accent-folded and upper case.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            F29Code::DebitoFiscal => &["DEBITOS", "DEBITO"],
            F29Code::CreditoFiscal => &["CREDITO"],
            F29Code::Ppm => &["PPM"],
            F29Code::Remanente => &["REMANENTE"],
            F29Code::VentasNetas => &["BASE"],
        }
    }

    /// Whether a missing value makes the whole form unusable.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            F29Code::DebitoFiscal | F29Code::CreditoFiscal | F29Code::VentasNetas
        )
    }

    /// Look a code up by its printed number.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label.trim())
    }
}

impl fmt::Display for F29Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive CLP range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRange {
    pub min: u64,
    pub max: u64,
}

impl CodeRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// The five numeric codes recovered from the document.
///
/// A parsed zero is never stored: absence and zero are the same thing on an F29.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedCodes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debito_fiscal: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credito_fiscal: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ppm: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remanente: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ventas_netas: Option<u64>,
}

impl ExtractedCodes {
    /// Value of a code, `None` when absent.
    pub fn get(&self, code: F29Code) -> Option<u64> {
        *self.slot(code)
    }

    /// Present (non-zero) value of a code.
    pub fn present(&self, code: F29Code) -> Option<u64> {
        self.get(code).filter(|v| *v > 0)
    }

    /// Store a value. Zero clears the field.
    pub fn set(&mut self, code: F29Code, value: u64) {
        *self.slot_mut(code) = (value > 0).then_some(value);
    }

    pub fn is_set(&self, code: F29Code) -> bool {
        self.present(code).is_some()
    }

    /// Number of codes with a value.
    pub fn present_count(&self) -> usize {
        F29Code::ALL.iter().filter(|c| self.is_set(**c)).count()
    }

    /// Codes with a value, in extraction order.
    pub fn iter(&self) -> impl Iterator<Item = (F29Code, u64)> + '_ {
        F29Code::ALL
            .into_iter()
            .filter_map(|c| self.present(c).map(|v| (c, v)))
    }

    fn slot(&self, code: F29Code) -> &Option<u64> {
        match code {
            F29Code::DebitoFiscal => &self.debito_fiscal,
            F29Code::CreditoFiscal => &self.credito_fiscal,
            F29Code::Ppm => &self.ppm,
            F29Code::Remanente => &self.remanente,
            F29Code::VentasNetas => &self.ventas_netas,
        }
    }

    fn slot_mut(&mut self, code: F29Code) -> &mut Option<u64> {
        match code {
            F29Code::DebitoFiscal => &mut self.debito_fiscal,
            F29Code::CreditoFiscal => &mut self.credito_fiscal,
            F29Code::Ppm => &mut self.ppm,
            F29Code::Remanente => &mut self.remanente,
            F29Code::VentasNetas => &mut self.ventas_netas,
        }
    }
}

/// Identity fields of the taxpayer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityField {
    Rut,
    Periodo,
    Folio,
    RazonSocial,
}

impl IdentityField {
    pub const ALL: [IdentityField; 4] = [
        IdentityField::Rut,
        IdentityField::Periodo,
        IdentityField::Folio,
        IdentityField::RazonSocial,
    ];

    pub fn field_name(&self) -> &'static str {
        match self {
            IdentityField::Rut => "rut",
            IdentityField::Periodo => "periodo",
            IdentityField::Folio => "folio",
            IdentityField::RazonSocial => "razonSocial",
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Best-effort taxpayer identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityFields {
    /// Chilean tax ID, normalized as `12345678-9`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rut: Option<String>,

    /// Tax period as `YYYYMM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodo: Option<String>,

    /// Form serial number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folio: Option<String>,

    /// Company name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub razon_social: Option<String>,
}

impl IdentityFields {
    pub fn get(&self, field: IdentityField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: IdentityField, value: impl Into<String>) {
        let value = value.into();
        *self.slot_mut(field) = (!value.trim().is_empty()).then_some(value);
    }

    pub fn is_set(&self, field: IdentityField) -> bool {
        self.get(field).is_some()
    }

    pub fn present_count(&self) -> usize {
        IdentityField::ALL.iter().filter(|f| self.is_set(**f)).count()
    }

    fn slot(&self, field: IdentityField) -> &Option<String> {
        match field {
            IdentityField::Rut => &self.rut,
            IdentityField::Periodo => &self.periodo,
            IdentityField::Folio => &self.folio,
            IdentityField::RazonSocial => &self.razon_social,
        }
    }

    fn slot_mut(&mut self, field: IdentityField) -> &mut Option<String> {
        match field {
            IdentityField::Rut => &mut self.rut,
            IdentityField::Periodo => &mut self.periodo,
            IdentityField::Folio => &mut self.folio,
            IdentityField::RazonSocial => &mut self.razon_social,
        }
    }
}

/// Totals computed from the extracted codes. Never read from the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedFields {
    /// Net purchases, `round(creditoFiscal / 0.19)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compras_netas: Option<u64>,

    /// VAT payable, `debitoFiscal - creditoFiscal`. Negative means credit in favour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iva_pagar: Option<i64>,

    /// `ivaPagar + ppm + remanente`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_a_pagar: Option<i64>,
}

/// Which strategy (or the combiner) produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    /// Per-encoding regex and proximity search.
    BinaryRegex,
    /// Line-adjacency scan with range filtering.
    Visual,
    /// Exact byte matches against known documents.
    Fingerprint,
    /// RUT, period, folio and company name.
    Identity,
    /// Confidence-ordered merge of all strategies.
    SuperParser,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::BinaryRegex => "binary-regex",
            ExtractionMethod::Visual => "visual",
            ExtractionMethod::Fingerprint => "fingerprint",
            ExtractionMethod::Identity => "identity",
            ExtractionMethod::SuperParser => "super-parser",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured F29 data handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    #[serde(flatten)]
    pub codes: ExtractedCodes,

    #[serde(flatten)]
    pub identity: IdentityFields,

    #[serde(flatten)]
    pub derived: DerivedFields,

    /// Producer of this result.
    pub method: ExtractionMethod,

    /// Confidence score (0 - 100).
    pub confidence: u32,

    /// Provenance log, in the order signals were found.
    #[serde(default)]
    pub detected_values: Vec<String>,

    /// Set after validation.
    #[serde(default)]
    pub is_valid: bool,
}

impl ExtractionResult {
    /// Create an empty result for the given producer.
    pub fn new(method: ExtractionMethod) -> Self {
        Self {
            codes: ExtractedCodes::default(),
            identity: IdentityFields::default(),
            derived: DerivedFields::default(),
            method,
            confidence: 0,
            detected_values: Vec::new(),
            is_valid: false,
        }
    }

    /// Build a result from codes alone; mostly useful for validation.
    pub fn from_codes(codes: ExtractedCodes) -> Self {
        Self {
            codes,
            ..Self::new(ExtractionMethod::SuperParser)
        }
    }

    /// Add to the confidence, clamped to 100.
    pub fn add_confidence(&mut self, points: u32) {
        self.confidence = (self.confidence + points).min(100);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_labels() {
        assert_eq!(F29Code::from_label("538"), Some(F29Code::DebitoFiscal));
        assert_eq!(F29Code::from_label(" 062 "), Some(F29Code::Ppm));
        assert_eq!(F29Code::from_label("999"), None);
        assert_eq!(F29Code::VentasNetas.to_string(), "563");
    }

    #[test]
    fn test_zero_is_absent() {
        let mut codes = ExtractedCodes::default();
        codes.set(F29Code::Ppm, 0);
        assert!(!codes.is_set(F29Code::Ppm));
        assert_eq!(codes.get(F29Code::Ppm), None);

        codes.set(F29Code::Ppm, 45_000);
        assert_eq!(codes.present(F29Code::Ppm), Some(45_000));
        assert_eq!(codes.present_count(), 1);
    }

    #[test]
    fn test_result_serializes_flat_camel_case() {
        let mut result = ExtractionResult::new(ExtractionMethod::SuperParser);
        result.codes.set(F29Code::DebitoFiscal, 3_410_651);
        result.identity.set(IdentityField::RazonSocial, "Comercial Andes SpA");
        result.derived.iva_pagar = Some(-777_992);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["debitoFiscal"], 3_410_651);
        assert_eq!(json["razonSocial"], "Comercial Andes SpA");
        assert_eq!(json["ivaPagar"], -777_992);
        assert_eq!(json["method"], "super-parser");
        assert!(json.get("creditoFiscal").is_none());

        let back: ExtractionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_confidence_clamps() {
        let mut result = ExtractionResult::new(ExtractionMethod::Visual);
        result.add_confidence(70);
        result.add_confidence(45);
        assert_eq!(result.confidence, 100);
    }
}
