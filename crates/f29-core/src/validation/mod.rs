//! Coherence validation of extracted F29 data.
//!
//! Validation never fails: problems are reported as data and the caller
//! decides whether to auto-correct, ask the user, or reject the form.

mod policy;

pub use policy::{RangePolicy, ValidationPolicy};

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::derived::{coherence_ratio, expected_debito, net_from_vat};
use crate::extract::rules::patterns::PERIOD_CANONICAL;
use crate::extract::rules::{period_date, rut_length};
use crate::models::f29::{ExtractionResult, F29Code};

/// Severity of a validation error. Critical and High make a result invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

/// Impact of a validation warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

/// Machine-readable rule identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    MissingCriticalField,
    MissingOptionalField,
    OutOfRange,
    AtypicalValue,
    VatIncoherent,
    VatDeviation,
    LargeCreditBalance,
    InvalidRut,
    InvalidPeriod,
    DerivedMismatch,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::MissingCriticalField => "MISSING_CRITICAL_FIELD",
            ValidationCode::MissingOptionalField => "MISSING_OPTIONAL_FIELD",
            ValidationCode::OutOfRange => "OUT_OF_RANGE",
            ValidationCode::AtypicalValue => "ATYPICAL_VALUE",
            ValidationCode::VatIncoherent => "VAT_INCOHERENT",
            ValidationCode::VatDeviation => "VAT_DEVIATION",
            ValidationCode::LargeCreditBalance => "LARGE_CREDIT_BALANCE",
            ValidationCode::InvalidRut => "INVALID_RUT",
            ValidationCode::InvalidPeriod => "INVALID_PERIOD",
            ValidationCode::DerivedMismatch => "DERIVED_MISMATCH",
        }
    }

    /// Confidence points the rule costs when triggered.
    pub fn penalty(&self) -> u32 {
        match self {
            ValidationCode::MissingCriticalField => 25,
            ValidationCode::MissingOptionalField => 5,
            ValidationCode::OutOfRange => 20,
            ValidationCode::AtypicalValue => 3,
            ValidationCode::VatIncoherent => 15,
            ValidationCode::VatDeviation => 5,
            ValidationCode::LargeCreditBalance => 5,
            ValidationCode::InvalidRut => 10,
            ValidationCode::InvalidPeriod => 5,
            ValidationCode::DerivedMismatch => 10,
        }
    }

    /// Actionable hint shown to the user.
    pub fn suggestion(&self) -> &'static str {
        match self {
            ValidationCode::MissingCriticalField => {
                "Check that codes 538, 511 and 563 are legible in the document and enter any missing value manually"
            }
            ValidationCode::MissingOptionalField => {
                "PPM (062) and remanente (077) can legitimately be empty; confirm them against the form"
            }
            ValidationCode::OutOfRange => {
                "Values outside their valid range are probably misread; re-enter them from the form"
            }
            ValidationCode::AtypicalValue => {
                "Some amounts are unusual for a small or medium business; confirm them against the form"
            }
            ValidationCode::VatIncoherent => {
                "Débito fiscal should be close to 19% of ventas netas; apply the suggested value or re-check both codes"
            }
            ValidationCode::VatDeviation => {
                "Débito fiscal deviates from 19% of ventas netas; review exempt sales or misread digits"
            }
            ValidationCode::LargeCreditBalance => {
                "A large VAT credit is carried forward; confirm crédito fiscal (511)"
            }
            ValidationCode::InvalidRut => "Enter the taxpayer RUT manually",
            ValidationCode::InvalidPeriod => "Enter the tax period as YYYYMM",
            ValidationCode::DerivedMismatch => "Recompute the derived totals from the extracted codes",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub code: ValidationCode,
    pub field: String,
    pub message: String,
    pub severity: Severity,
    /// Corrected value, when one can be computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<i64>,
}

/// A soft finding that never affects validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
    pub code: ValidationCode,
    pub field: String,
    pub message: String,
    pub impact: Impact,
}

/// Outcome of validating one result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Starts at 100, minus every triggered rule, floored at 0.
    pub confidence: u32,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub suggestions: Vec<String>,
    pub summary: String,
}

impl ValidationResult {
    /// Whether any error or warning carries the given rule code.
    pub fn has(&self, code: ValidationCode) -> bool {
        self.errors.iter().any(|e| e.code == code) || self.warnings.iter().any(|w| w.code == code)
    }
}

/// Collects findings in rule order.
#[derive(Default)]
struct Findings {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
    triggered: Vec<ValidationCode>,
    penalty: u32,
}

impl Findings {
    fn error(
        &mut self,
        code: ValidationCode,
        field: &str,
        severity: Severity,
        message: String,
        suggested_fix: Option<i64>,
    ) {
        self.note(code);
        self.errors.push(ValidationError {
            code,
            field: field.to_string(),
            message,
            severity,
            suggested_fix,
        });
    }

    fn warning(&mut self, code: ValidationCode, field: &str, impact: Impact, message: String) {
        self.note(code);
        self.warnings.push(ValidationWarning {
            code,
            field: field.to_string(),
            message,
            impact,
        });
    }

    fn note(&mut self, code: ValidationCode) {
        self.penalty += code.penalty();
        if !self.triggered.contains(&code) {
            self.triggered.push(code);
        }
    }

    fn finish(self) -> ValidationResult {
        let is_valid = !self.errors.iter().any(|e| e.severity.is_blocking());
        let confidence = 100u32.saturating_sub(self.penalty);
        let summary = summary(is_valid, confidence, self.errors.len());

        ValidationResult {
            is_valid,
            confidence,
            errors: self.errors,
            warnings: self.warnings,
            suggestions: self
                .triggered
                .iter()
                .map(|c| c.suggestion().to_string())
                .collect(),
            summary,
        }
    }
}

fn summary(is_valid: bool, confidence: u32, errors: usize) -> String {
    match (is_valid, confidence, errors) {
        (true, 90.., 0) => "F29 data is coherent and complete".to_string(),
        (true, 70.., _) => "F29 data is valid; review the warnings before filing".to_string(),
        (true, _, _) => "F29 data is valid but confidence is low; manual review recommended".to_string(),
        (false, _, 1) => "F29 data has a blocking error and needs correction".to_string(),
        (false, _, n) => format!("F29 data has {} errors and needs manual correction", n),
    }
}

/// Rule-based coherence validator.
pub struct Validator {
    policy: ValidationPolicy,
}

impl Validator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Run every rule against `result`.
    pub fn validate(&self, result: &ExtractionResult) -> ValidationResult {
        let mut findings = Findings::default();

        self.check_presence(result, &mut findings);
        self.check_ranges(result, &mut findings);
        self.check_coherence(result, &mut findings);
        self.check_credit_balance(result, &mut findings);
        self.check_identity(result, &mut findings);
        self.check_derived(result, &mut findings);

        let validation = findings.finish();
        debug!(
            "Validation: valid={} confidence={} errors={} warnings={}",
            validation.is_valid,
            validation.confidence,
            validation.errors.len(),
            validation.warnings.len()
        );
        validation
    }

    fn check_presence(&self, result: &ExtractionResult, findings: &mut Findings) {
        for code in F29Code::ALL {
            if result.codes.present(code).is_some() {
                continue;
            }
            if code.is_critical() {
                findings.error(
                    ValidationCode::MissingCriticalField,
                    code.field_name(),
                    Severity::Critical,
                    format!("Code {} ({}) is missing", code, code.description()),
                    None,
                );
            } else {
                findings.warning(
                    ValidationCode::MissingOptionalField,
                    code.field_name(),
                    Impact::Low,
                    format!("Code {} ({}) was not found", code, code.description()),
                );
            }
        }
    }

    fn check_ranges(&self, result: &ExtractionResult, findings: &mut Findings) {
        for (code, value) in result.codes.iter() {
            let Some(range) = self.policy.ranges.get(&code) else {
                continue;
            };

            if !range.absolute.contains(value) {
                findings.error(
                    ValidationCode::OutOfRange,
                    code.field_name(),
                    Severity::High,
                    format!(
                        "Code {} = {} is outside the valid range {}..={}",
                        code, value, range.absolute.min, range.absolute.max
                    ),
                    None,
                );
            } else if !range.typical.contains(value) {
                findings.warning(
                    ValidationCode::AtypicalValue,
                    code.field_name(),
                    Impact::Medium,
                    format!(
                        "Code {} = {} is outside the usual range {}..={}",
                        code, value, range.typical.min, range.typical.max
                    ),
                );
            }
        }
    }

    fn check_coherence(&self, result: &ExtractionResult, findings: &mut Findings) {
        let (Some(debito), Some(ventas)) = (
            result.codes.present(F29Code::DebitoFiscal),
            result.codes.present(F29Code::VentasNetas),
        ) else {
            return;
        };
        let Some(ratio) = coherence_ratio(debito, ventas, self.policy.vat_rate) else {
            return;
        };

        let expected = expected_debito(ventas, self.policy.vat_rate);
        let field = F29Code::DebitoFiscal.field_name();

        if ratio > self.policy.coherence_error_ratio {
            findings.error(
                ValidationCode::VatIncoherent,
                field,
                Severity::High,
                format!(
                    "Débito fiscal {} differs {:.1}% from the {} implied by ventas netas {}",
                    debito,
                    ratio * 100.0,
                    expected,
                    ventas
                ),
                i64::try_from(expected).ok(),
            );
        } else if ratio >= self.policy.coherence_warning_ratio {
            findings.warning(
                ValidationCode::VatDeviation,
                field,
                Impact::Medium,
                format!(
                    "Débito fiscal {} deviates {:.1}% from the expected {}",
                    debito,
                    ratio * 100.0,
                    expected
                ),
            );
        }
    }

    fn check_credit_balance(&self, result: &ExtractionResult, findings: &mut Findings) {
        let (Some(debito), Some(credito)) = (
            result.codes.present(F29Code::DebitoFiscal),
            result.codes.present(F29Code::CreditoFiscal),
        ) else {
            return;
        };

        let balance = i128::from(debito) - i128::from(credito);
        if balance < -i128::from(self.policy.large_credit_threshold) {
            findings.warning(
                ValidationCode::LargeCreditBalance,
                "ivaPagar",
                Impact::Medium,
                format!("VAT credit balance of {} carried forward", balance),
            );
        }
    }

    fn check_identity(&self, result: &ExtractionResult, findings: &mut Findings) {
        match result.identity.rut.as_deref() {
            Some(rut) if rut_length(rut) >= self.policy.min_rut_len => {}
            Some(rut) => findings.error(
                ValidationCode::InvalidRut,
                "rut",
                Severity::Medium,
                format!("RUT {} is too short", rut),
                None,
            ),
            None => findings.error(
                ValidationCode::InvalidRut,
                "rut",
                Severity::Medium,
                "RUT is missing".to_string(),
                None,
            ),
        }

        let period_ok = result
            .identity
            .periodo
            .as_deref()
            .is_some_and(|p| PERIOD_CANONICAL.is_match(p) && period_date(p).is_some());
        if !period_ok {
            let message = match &result.identity.periodo {
                Some(p) => format!("Period {} is not a YYYYMM value", p),
                None => "Period is missing".to_string(),
            };
            findings.warning(ValidationCode::InvalidPeriod, "periodo", Impact::Low, message);
        }
    }

    fn check_derived(&self, result: &ExtractionResult, findings: &mut Findings) {
        let (Some(stored), Some(credito)) = (
            result.derived.compras_netas,
            result.codes.present(F29Code::CreditoFiscal),
        ) else {
            return;
        };
        let Some(expected) = net_from_vat(credito, self.policy.vat_rate) else {
            return;
        };

        if stored.abs_diff(expected) > self.policy.derived_tolerance {
            findings.error(
                ValidationCode::DerivedMismatch,
                "comprasNetas",
                Severity::Medium,
                format!("comprasNetas {} should be {}", stored, expected),
                i64::try_from(expected).ok(),
            );
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationPolicy::default())
    }
}
