// ⚖️ Settlement Calculator - Derive payable amounts from a settlement
//
// Formula chain:
//   total_deductions = Σ active deduction contributions
//   base_payable     = max(0, settlement_amount - total_deductions)
//   net_payable      = base_payable + total_input_tax_deduction
//
// The tax branch simulates the invoice mix: special (creditable) invoices
// are grossed up by the tax rate, and the input-tax credit is recovered by
// extracting the tax component back out of the gross amount.

use crate::deductions::{total_deductions, DeductionItem};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// MODES & PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeductionMode {
    /// Real invoices reconciled later: no simulated tax credit at all
    Actual,

    /// Simulate the invoice mix ahead of reconciliation
    Estimated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationScenario {
    /// 100% special (input-tax-creditable) invoicing
    Special,

    /// 100% general (non-creditable) invoicing
    General,

    /// Split by `mixed_special_ratio`
    Mixed,
}

impl EstimationScenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimationScenario::Special => "special",
            EstimationScenario::General => "general",
            EstimationScenario::Mixed => "mixed",
        }
    }
}

/// Tax rates offered by the estimation UI (design services, construction
/// services, goods/equipment). Direct writes are not restricted to this
/// set; see `EstimationParams::set_tax_rate`.
pub const PERMITTED_TAX_RATES: [f64; 3] = [0.06, 0.09, 0.13];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimationParams {
    /// VAT rate used for gross-up and credit extraction
    #[serde(rename = "taxRate")]
    pub tax_rate: f64,

    /// Fraction of the tax-deductible base attributed to special
    /// invoicing under Mixed; the remainder goes to general invoicing
    #[serde(rename = "mixedSpecialRatio")]
    pub mixed_special_ratio: f64,
}

impl EstimationParams {
    pub fn new(tax_rate: f64, mixed_special_ratio: f64) -> Self {
        EstimationParams {
            tax_rate,
            mixed_special_ratio: mixed_special_ratio.clamp(0.0, 1.0),
        }
    }

    /// Any finite rate is accepted; rates outside the offered set are
    /// only warned about, since the calculator stays total regardless.
    pub fn set_tax_rate(&mut self, tax_rate: f64) {
        if !PERMITTED_TAX_RATES
            .iter()
            .any(|rate| (rate - tax_rate).abs() < f64::EPSILON)
        {
            warn!(tax_rate, "tax rate outside the offered set");
        }
        self.tax_rate = tax_rate;
    }

    pub fn set_mixed_special_ratio(&mut self, ratio: f64) {
        self.mixed_special_ratio = ratio.clamp(0.0, 1.0);
    }
}

impl Default for EstimationParams {
    fn default() -> Self {
        EstimationParams {
            tax_rate: 0.06,
            mixed_special_ratio: 0.5,
        }
    }
}

// ============================================================================
// DERIVED FINANCIALS
// ============================================================================

/// Computed, never stored: fully determined by the settlement amount,
/// the deduction items, the mode/scenario and the estimation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedFinancials {
    pub total_deductions: f64,
    pub base_payable: f64,
    pub total_input_tax_deduction: f64,
    pub invoice_total: f64,
    pub special_amt: f64,
    pub general_amt: f64,
    pub net_payable: f64,
}

// ============================================================================
// TAX HELPERS
// ============================================================================

/// Tax-inclusive amount from a tax-exclusive base.
pub fn gross_up(base: f64, rate: f64) -> f64 {
    base * (1.0 + rate)
}

/// Recover the tax component from a tax-inclusive amount.
/// `extract_tax(gross_up(x, r), r)` equals `x * r` algebraically.
pub fn extract_tax(gross: f64, rate: f64) -> f64 {
    gross / (1.0 + rate) * rate
}

// ============================================================================
// CALCULATOR
// ============================================================================

/// Compute the full derived financials for one settlement snapshot.
///
/// Pure and deterministic: identical inputs yield identical output, which
/// is what lets the controller memoize on an input fingerprint.
pub fn compute_financials(
    settlement_amount: f64,
    items: &[DeductionItem],
    mode: DeductionMode,
    scenario: EstimationScenario,
    params: &EstimationParams,
) -> DerivedFinancials {
    let deductions = total_deductions(settlement_amount, items);

    // Settlement never produces a negative payable base.
    let base_payable = (settlement_amount - deductions).max(0.0);

    let mut total_input_tax_deduction = 0.0;
    let mut special_amt = 0.0;
    let mut general_amt = 0.0;
    let mut invoice_total = 0.0;

    if mode == DeductionMode::Estimated {
        match scenario {
            EstimationScenario::Special => {
                special_amt = gross_up(base_payable, params.tax_rate);
                total_input_tax_deduction = extract_tax(special_amt, params.tax_rate);
                invoice_total = special_amt;
            }
            EstimationScenario::General => {
                general_amt = base_payable;
                invoice_total = general_amt;
            }
            EstimationScenario::Mixed => {
                // Exact complement via a single subtraction, so the two
                // bases always sum back to base_payable.
                let base_from_special = base_payable * params.mixed_special_ratio;
                let base_from_general = base_payable - base_from_special;
                special_amt = gross_up(base_from_special, params.tax_rate);
                general_amt = base_from_general;
                total_input_tax_deduction = extract_tax(special_amt, params.tax_rate);
                invoice_total = special_amt + general_amt;
            }
        }
    }

    DerivedFinancials {
        total_deductions: deductions,
        base_payable,
        total_input_tax_deduction,
        invoice_total,
        special_amt,
        general_amt,
        net_payable: base_payable + total_input_tax_deduction,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deductions::DeductionLedger;

    const EPS: f64 = 1e-6;

    fn standard_items() -> Vec<DeductionItem> {
        DeductionLedger::standard().items().to_vec()
    }

    #[test]
    fn test_end_to_end_special_example() {
        // 250000 settlement, 10% rate deductions + 59700 fixed = 84700,
        // base 165300; special @ 6% => 175218 gross, 9918 credit.
        let items = standard_items();
        let params = EstimationParams::new(0.06, 0.5);

        let fin = compute_financials(
            250000.0,
            &items,
            DeductionMode::Estimated,
            EstimationScenario::Special,
            &params,
        );

        assert!((fin.total_deductions - 84700.0).abs() < EPS);
        assert!((fin.base_payable - 165300.0).abs() < EPS);
        assert!((fin.special_amt - 175218.0).abs() < EPS);
        assert!((fin.total_input_tax_deduction - 9918.0).abs() < EPS);
        assert!((fin.invoice_total - 175218.0).abs() < EPS);
        assert_eq!(fin.general_amt, 0.0);
        assert!((fin.net_payable - 175218.0).abs() < EPS);
    }

    #[test]
    fn test_base_payable_floors_at_zero() {
        let items = vec![DeductionItem::fixed("big", "Oversized deduction", 500.0)];
        let params = EstimationParams::default();

        let fin = compute_financials(
            100.0,
            &items,
            DeductionMode::Estimated,
            EstimationScenario::Special,
            &params,
        );

        assert_eq!(fin.base_payable, 0.0);
        // Zero base forces every invoice field to zero regardless of scenario.
        assert_eq!(fin.special_amt, 0.0);
        assert_eq!(fin.general_amt, 0.0);
        assert_eq!(fin.total_input_tax_deduction, 0.0);
        assert_eq!(fin.net_payable, 0.0);
    }

    #[test]
    fn test_actual_mode_defers_tax_entirely() {
        let items = standard_items();
        let params = EstimationParams::new(0.13, 0.8);

        let fin = compute_financials(
            250000.0,
            &items,
            DeductionMode::Actual,
            EstimationScenario::Mixed,
            &params,
        );

        assert_eq!(fin.total_input_tax_deduction, 0.0);
        assert_eq!(fin.invoice_total, 0.0);
        assert_eq!(fin.special_amt, 0.0);
        assert_eq!(fin.general_amt, 0.0);
        assert!((fin.net_payable - fin.base_payable).abs() < EPS);
    }

    #[test]
    fn test_general_scenario() {
        let items = standard_items();
        let params = EstimationParams::new(0.06, 0.5);

        let fin = compute_financials(
            250000.0,
            &items,
            DeductionMode::Estimated,
            EstimationScenario::General,
            &params,
        );

        assert!((fin.general_amt - 165300.0).abs() < EPS);
        assert_eq!(fin.special_amt, 0.0);
        assert_eq!(fin.total_input_tax_deduction, 0.0);
        assert!((fin.invoice_total - 165300.0).abs() < EPS);
        assert!((fin.net_payable - 165300.0).abs() < EPS);
    }

    #[test]
    fn test_mixed_split_exactness() {
        let items = standard_items();

        for ratio in [0.0, 0.1, 0.33, 0.5, 0.77, 1.0] {
            let params = EstimationParams::new(0.09, ratio);
            let fin = compute_financials(
                250000.0,
                &items,
                DeductionMode::Estimated,
                EstimationScenario::Mixed,
                &params,
            );

            // Replicate the split: the general base is the exact complement
            // of the special base, and the two sum back to base_payable
            // within representable precision.
            let base_from_special = fin.base_payable * ratio;
            let base_from_general = fin.base_payable - base_from_special;
            assert_eq!(fin.general_amt, base_from_general);
            assert!(
                (base_from_special + base_from_general - fin.base_payable).abs()
                    <= 2.0 * f64::EPSILON * fin.base_payable
            );
            assert!((fin.special_amt - gross_up(base_from_special, 0.09)).abs() < EPS);
            assert!((fin.invoice_total - (fin.special_amt + fin.general_amt)).abs() < EPS);
        }
    }

    #[test]
    fn test_special_tax_round_trip() {
        for x in [0.0, 1.0, 999.99, 165300.0] {
            for r in [0.0, 0.06, 0.09, 0.13] {
                assert!((extract_tax(gross_up(x, r), r) - x * r).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_zero_rate_collapses_special_to_general() {
        let items = standard_items();
        let params = EstimationParams::new(0.0, 0.5);

        let special = compute_financials(
            250000.0,
            &items,
            DeductionMode::Estimated,
            EstimationScenario::Special,
            &params,
        );
        let general = compute_financials(
            250000.0,
            &items,
            DeductionMode::Estimated,
            EstimationScenario::General,
            &params,
        );

        assert!((special.special_amt - general.base_payable).abs() < EPS);
        assert_eq!(special.total_input_tax_deduction, 0.0);
        assert!((special.net_payable - general.net_payable).abs() < EPS);
    }

    #[test]
    fn test_net_payable_never_below_base() {
        let items = standard_items();
        for ratio in [0.0, 0.5, 1.0] {
            for scenario in [
                EstimationScenario::Special,
                EstimationScenario::General,
                EstimationScenario::Mixed,
            ] {
                let params = EstimationParams::new(0.13, ratio);
                let fin = compute_financials(
                    250000.0,
                    &items,
                    DeductionMode::Estimated,
                    scenario,
                    &params,
                );
                assert!(fin.net_payable >= fin.base_payable);
            }
        }
    }

    #[test]
    fn test_determinism() {
        let items = standard_items();
        let params = EstimationParams::new(0.06, 0.37);

        let a = compute_financials(
            250000.0,
            &items,
            DeductionMode::Estimated,
            EstimationScenario::Mixed,
            &params,
        );
        let b = compute_financials(
            250000.0,
            &items,
            DeductionMode::Estimated,
            EstimationScenario::Mixed,
            &params,
        );

        assert_eq!(a, b);
    }

    #[test]
    fn test_ratio_constructor_clamps() {
        let params = EstimationParams::new(0.06, 1.8);
        assert_eq!(params.mixed_special_ratio, 1.0);

        let params = EstimationParams::new(0.06, -0.2);
        assert_eq!(params.mixed_special_ratio, 0.0);
    }
}
