// 📄 Subcontract Entity - The contract this settlement is drawn against

use serde::{Deserialize, Serialize};

// ============================================================================
// SUBCONTRACT INFO
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubcontractInfo {
    pub contract_name: String,
    pub contract_no: String,

    /// Subcontractor (vendor) name
    pub vendor_name: String,

    /// Cooperation mode, e.g. franchise vs. direct
    pub cooperation_mode: String,

    pub contract_amount: f64,

    /// Settlements already made against this subcontract
    pub accumulated_settlement: f64,

    /// Remaining amount not yet settled
    pub unsettled_amount: f64,

    /// Invoices received from the subcontractor so far
    pub accumulated_invoicing: f64,

    /// Payments made so far
    pub paid_amount: f64,
}

impl SubcontractInfo {
    /// Demo subcontract used by the CLI walkthrough.
    pub fn sample() -> Self {
        SubcontractInfo {
            contract_name:
                "Subcontract - landscape design detailing labor outsourcing agreement".to_string(),
            contract_no: "SUB-SZ-2024-005".to_string(),
            vendor_name: "CH Landscape Engineering Consulting Service Dept".to_string(),
            cooperation_mode: "Franchise".to_string(),
            contract_amount: 600_000.00,
            accumulated_settlement: 350_000.00,
            unsettled_amount: 250_000.00,
            accumulated_invoicing: 220_000.00,
            paid_amount: 200_000.00,
        }
    }
}
