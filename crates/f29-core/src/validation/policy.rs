//! Configurable thresholds for the coherence validator.
//!
//! The typical PyME ranges and the coherence tolerances are empirical. They
//! are defaults, not tax law, and can be overridden from the config file.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::extract::derived::VAT_RATE;
use crate::models::f29::{CodeRange, F29Code};

/// Valid and typical magnitudes for one code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangePolicy {
    /// Values outside this range are treated as misreads.
    pub absolute: CodeRange,
    /// Usual magnitude for a small or medium business.
    pub typical: CodeRange,
}

impl RangePolicy {
    pub const fn new(absolute: CodeRange, typical: CodeRange) -> Self {
        Self { absolute, typical }
    }
}

/// Validator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// VAT rate used for the débito / ventas relation and derived totals.
    pub vat_rate: Decimal,

    /// Per-code ranges. Codes without an entry are not range checked.
    pub ranges: BTreeMap<F29Code, RangePolicy>,

    /// Relative débito error above which the form is incoherent.
    pub coherence_error_ratio: f64,

    /// Relative débito error from which a deviation warning is raised.
    pub coherence_warning_ratio: f64,

    /// `ivaPagar` below the negative of this raises a credit balance warning.
    pub large_credit_threshold: i64,

    /// Allowed difference between stored and recomputed `comprasNetas`.
    pub derived_tolerance: u64,

    /// Minimum RUT length after stripping separators.
    pub min_rut_len: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            vat_rate: VAT_RATE,
            ranges: default_ranges(),
            coherence_error_ratio: 0.5,
            coherence_warning_ratio: 0.2,
            large_credit_threshold: 10_000_000,
            derived_tolerance: 1_000,
            min_rut_len: 8,
        }
    }
}

fn default_ranges() -> BTreeMap<F29Code, RangePolicy> {
    BTreeMap::from([
        (
            F29Code::DebitoFiscal,
            RangePolicy::new(
                CodeRange::new(1, 5_000_000_000),
                CodeRange::new(100_000, 10_000_000),
            ),
        ),
        (
            F29Code::CreditoFiscal,
            RangePolicy::new(
                CodeRange::new(1, 5_000_000_000),
                CodeRange::new(50_000, 20_000_000),
            ),
        ),
        (
            F29Code::Ppm,
            RangePolicy::new(
                CodeRange::new(1, 1_000_000_000),
                CodeRange::new(10_000, 1_000_000),
            ),
        ),
        (
            F29Code::Remanente,
            RangePolicy::new(
                CodeRange::new(1, 10_000_000_000),
                CodeRange::new(1, 50_000_000),
            ),
        ),
        (
            F29Code::VentasNetas,
            RangePolicy::new(
                CodeRange::new(1, 50_000_000_000),
                CodeRange::new(1_000_000, 100_000_000),
            ),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_round_trip_through_json() {
        let policy = ValidationPolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        let parsed: ValidationPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, policy);
    }

    #[test]
    fn test_partial_override() {
        let policy: ValidationPolicy =
            serde_json::from_str(r#"{"coherence_error_ratio": 0.4, "min_rut_len": 9}"#).unwrap();
        assert_eq!(policy.coherence_error_ratio, 0.4);
        assert_eq!(policy.min_rut_len, 9);
        assert_eq!(policy.vat_rate, VAT_RATE);
        assert_eq!(policy.ranges.len(), 5);
    }
}
