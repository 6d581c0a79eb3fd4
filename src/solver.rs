// 🔁 Tax-Mix Reverse Solver - Infer the allocation ratio from an edited amount
//
// Inverse of the calculator's Mixed branch: when the user edits a derived
// special or general amount, the ratio that would have produced it is
// inferred and written back to the parameters, keeping the data flow
// unidirectional instead of two-way-bound.

// ============================================================================
// SOLVER
// ============================================================================

/// Infer `mixed_special_ratio` from an edited tax-inclusive special amount.
///
/// Strips the tax component, then divides by the payable base. Returns
/// `None` when `base_payable <= 0` (degenerate denominator): the caller
/// retains its current ratio. Out-of-range edits saturate at 0 or 1
/// rather than erroring.
pub fn infer_ratio_from_special_amount(
    tax_inclusive_special: f64,
    base_payable: f64,
    tax_rate: f64,
) -> Option<f64> {
    if base_payable <= 0.0 {
        return None;
    }
    let base_from_special = tax_inclusive_special / (1.0 + tax_rate);
    Some((base_from_special / base_payable).clamp(0.0, 1.0))
}

/// Infer `mixed_special_ratio` from an edited general (tax-exclusive) amount.
///
/// The general amount is the complement of the special base, so the ratio
/// is what remains of the base after it. Same degenerate-base and
/// clamping policy as the special direction.
pub fn infer_ratio_from_general_amount(general_amt: f64, base_payable: f64) -> Option<f64> {
    if base_payable <= 0.0 {
        return None;
    }
    Some(((base_payable - general_amt) / base_payable).clamp(0.0, 1.0))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{
        compute_financials, DeductionMode, EstimationParams, EstimationScenario,
    };
    use crate::deductions::DeductionItem;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_round_trip_from_special_amount() {
        // base 1000 @ 6%, ratio 0.5 => special = 500 * 1.06 = 530;
        // feeding 530 back must recover 0.5.
        let ratio = infer_ratio_from_special_amount(530.0, 1000.0, 0.06).unwrap();
        assert!((ratio - 0.5).abs() < EPS);
    }

    #[test]
    fn test_round_trip_from_general_amount() {
        let ratio = infer_ratio_from_general_amount(500.0, 1000.0).unwrap();
        assert!((ratio - 0.5).abs() < EPS);
    }

    #[test]
    fn test_degenerate_base_is_a_no_op() {
        assert_eq!(infer_ratio_from_special_amount(530.0, 0.0, 0.06), None);
        assert_eq!(infer_ratio_from_special_amount(530.0, -10.0, 0.06), None);
        assert_eq!(infer_ratio_from_general_amount(500.0, 0.0), None);
    }

    #[test]
    fn test_clamp_at_upper_boundary() {
        // A special amount exceeding the entire tax-inclusive base
        // saturates the ratio at 1.
        let ratio = infer_ratio_from_special_amount(9999.0, 1000.0, 0.06).unwrap();
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn test_clamp_at_lower_boundary() {
        // A general amount above the whole base would imply a negative
        // ratio; it clamps to 0 instead.
        let ratio = infer_ratio_from_general_amount(1500.0, 1000.0).unwrap();
        assert_eq!(ratio, 0.0);

        let ratio = infer_ratio_from_special_amount(-50.0, 1000.0, 0.06).unwrap();
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn test_calculator_round_trip_consistency() {
        // Re-running the calculator with the inferred ratio reproduces
        // the edited amount (up to clamping).
        let items = vec![DeductionItem::fixed("flat", "Flat deduction", 0.0)];
        let mut params = EstimationParams::new(0.06, 0.5);

        let fin = compute_financials(
            1000.0,
            &items,
            DeductionMode::Estimated,
            EstimationScenario::Mixed,
            &params,
        );
        assert!((fin.special_amt - 530.0).abs() < EPS);

        let edited_special = 318.0; // base 300 => ratio 0.3
        let ratio =
            infer_ratio_from_special_amount(edited_special, fin.base_payable, 0.06).unwrap();
        params.set_mixed_special_ratio(ratio);

        let refin = compute_financials(
            1000.0,
            &items,
            DeductionMode::Estimated,
            EstimationScenario::Mixed,
            &params,
        );
        assert!((refin.special_amt - edited_special).abs() < 1e-6);
        assert!((refin.general_amt - 700.0).abs() < 1e-6);
    }
}
