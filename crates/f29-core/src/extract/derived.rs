//! Totals derived from the extracted codes.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

use crate::models::f29::{DerivedFields, ExtractedCodes, ExtractionResult, F29Code};

/// Chilean VAT rate (19 %).
pub const VAT_RATE: Decimal = Decimal::from_parts(19, 0, 0, false, 2);

impl DerivedFields {
    /// Compute the derived totals at the standard VAT rate.
    pub fn compute(codes: &ExtractedCodes) -> Self {
        Self::compute_with_rate(codes, VAT_RATE)
    }

    /// Compute the derived totals.
    ///
    /// `compras_netas` needs 511, `iva_pagar` needs 538 and 511. `total_a_pagar`
    /// needs `iva_pagar`; a missing PPM or remanente counts as zero there.
    /// A total that does not fit in `i64` stays unset.
    pub fn compute_with_rate(codes: &ExtractedCodes, vat_rate: Decimal) -> Self {
        let debito = codes.present(F29Code::DebitoFiscal);
        let credito = codes.present(F29Code::CreditoFiscal);

        let compras_netas = credito.and_then(|c| net_from_vat(c, vat_rate));
        let iva_pagar = match (debito, credito) {
            (Some(d), Some(c)) => i64::try_from(i128::from(d) - i128::from(c)).ok(),
            _ => None,
        };
        let total_a_pagar = iva_pagar.and_then(|iva| {
            let total = i128::from(iva)
                + i128::from(codes.present(F29Code::Ppm).unwrap_or(0))
                + i128::from(codes.present(F29Code::Remanente).unwrap_or(0));
            i64::try_from(total).ok()
        });

        Self {
            compras_netas,
            iva_pagar,
            total_a_pagar,
        }
    }
}

/// `round(ventas * rate)`, the débito fiscal a sales base implies.
pub fn expected_debito(ventas: u64, vat_rate: Decimal) -> u64 {
    round_to_u64(Decimal::from(ventas) * vat_rate).unwrap_or(0)
}

/// Relative error of `debito` against the débito implied by `ventas`.
///
/// `None` when the expected débito is zero.
pub fn coherence_ratio(debito: u64, ventas: u64, vat_rate: Decimal) -> Option<f64> {
    let expected = expected_debito(ventas, vat_rate);
    if expected == 0 {
        return None;
    }
    let diff = Decimal::from(debito) - Decimal::from(expected);
    (diff.abs() / Decimal::from(expected)).to_f64()
}

/// Recompute every derived field from the raw codes and note it in the provenance log.
pub fn auto_correct(result: &mut ExtractionResult, vat_rate: Decimal) {
    let corrected = DerivedFields::compute_with_rate(&result.codes, vat_rate);
    if corrected != result.derived {
        info!("Auto-correct replaced derived fields {:?} with {:?}", result.derived, corrected);
    }
    result.derived = corrected;
    result.detected_values.push("auto-correct: derived fields recomputed".to_string());
}

/// `round(vat / rate)`, the net base a VAT amount implies.
pub(crate) fn net_from_vat(vat: u64, vat_rate: Decimal) -> Option<u64> {
    Decimal::from(vat)
        .checked_div(vat_rate)
        .and_then(round_to_u64)
}

fn round_to_u64(value: Decimal) -> Option<u64> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::f29::ExtractionMethod;
    use pretty_assertions::assert_eq;

    fn codes(pairs: &[(F29Code, u64)]) -> ExtractedCodes {
        let mut codes = ExtractedCodes::default();
        for (code, value) in pairs {
            codes.set(*code, *value);
        }
        codes
    }

    #[test]
    fn test_credit_in_favour() {
        let derived = DerivedFields::compute(&codes(&[
            (F29Code::DebitoFiscal, 3_410_651),
            (F29Code::CreditoFiscal, 4_188_643),
        ]));

        assert_eq!(derived.iva_pagar, Some(-777_992));
        assert_eq!(derived.compras_netas, Some(22_045_489));
        assert_eq!(derived.total_a_pagar, Some(-777_992));
    }

    #[test]
    fn test_total_includes_ppm_and_remanente() {
        let derived = DerivedFields::compute(&codes(&[
            (F29Code::DebitoFiscal, 2_000_000),
            (F29Code::CreditoFiscal, 1_500_000),
            (F29Code::Ppm, 45_000),
            (F29Code::Remanente, 120_000),
        ]));
        assert_eq!(derived.iva_pagar, Some(500_000));
        assert_eq!(derived.total_a_pagar, Some(665_000));
    }

    #[test]
    fn test_missing_inputs_leave_fields_unset() {
        let derived = DerivedFields::compute(&codes(&[(F29Code::DebitoFiscal, 3_410_651)]));
        assert_eq!(derived, DerivedFields::default());

        let derived = DerivedFields::compute(&codes(&[(F29Code::CreditoFiscal, 190)]));
        assert_eq!(derived.compras_netas, Some(1_000));
        assert_eq!(derived.iva_pagar, None);
    }

    #[test]
    fn test_totals_outside_i64_stay_unset() {
        let derived = DerivedFields::compute(&codes(&[
            (F29Code::DebitoFiscal, u64::MAX),
            (F29Code::CreditoFiscal, 1),
        ]));
        assert_eq!(derived.iva_pagar, None);
        assert_eq!(derived.total_a_pagar, None);
        assert!(derived.compras_netas.is_some());

        let derived = DerivedFields::compute(&codes(&[
            (F29Code::DebitoFiscal, i64::MAX as u64),
            (F29Code::CreditoFiscal, 1),
            (F29Code::Ppm, 10),
        ]));
        assert_eq!(derived.iva_pagar, Some(i64::MAX - 1));
        assert_eq!(derived.total_a_pagar, None);

        let derived = DerivedFields::compute(&codes(&[
            (F29Code::DebitoFiscal, 9_000_000_000_000_000_000),
            (F29Code::CreditoFiscal, 18_000_000_000_000_000_000),
        ]));
        assert_eq!(derived.iva_pagar, Some(-9_000_000_000_000_000_000));
    }

    #[test]
    fn test_expected_debito_rounds_half_away() {
        assert_eq!(expected_debito(17_950_795, VAT_RATE), 3_410_651);
        // 50 * 0.19 = 9.5
        assert_eq!(expected_debito(50, VAT_RATE), 10);
        assert_eq!(expected_debito(0, VAT_RATE), 0);
    }

    #[test]
    fn test_coherence_ratio() {
        assert_eq!(coherence_ratio(3_410_651, 17_950_795, VAT_RATE), Some(0.0));
        let ratio = coherence_ratio(1_500_000, 10_000_000, VAT_RATE).unwrap();
        assert!((ratio - 0.2105).abs() < 0.001);
        assert_eq!(coherence_ratio(100, 0, VAT_RATE), None);
    }

    #[test]
    fn test_auto_correct_recomputes() {
        let mut result = ExtractionResult::new(ExtractionMethod::SuperParser);
        result.codes = codes(&[
            (F29Code::DebitoFiscal, 3_410_651),
            (F29Code::CreditoFiscal, 4_188_643),
        ]);
        result.derived.compras_netas = Some(1);

        auto_correct(&mut result, VAT_RATE);
        assert_eq!(result.derived.compras_netas, Some(22_045_489));
        assert_eq!(result.derived.iva_pagar, Some(-777_992));
        assert!(result.detected_values[0].starts_with("auto-correct"));
    }
}
