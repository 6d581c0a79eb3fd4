// 🏗️ Project Entity - Financial context the settlement is reviewed against
//
// Read-only within the workbench: the controller displays these figures
// and hands them to the narrative provider, it never mutates them.

use serde::{Deserialize, Serialize};

// ============================================================================
// PROJECT FINANCIALS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFinancials {
    pub project_name: String,
    pub project_no: String,

    /// Owning organization / branch / department chain
    pub project_belonging: String,

    /// Total contract amount
    pub total_amount: f64,

    /// Accumulated invoiced amount
    pub invoiced_amount: f64,

    /// Accumulated received payments
    pub received_amount: f64,

    /// Accumulated subcontract settlements already made
    pub accumulated_sub_settlement: f64,

    /// Funds still available for settlement against this project
    pub available_funds: f64,
}

impl ProjectFinancials {
    /// Demo project used by the CLI walkthrough.
    pub fn sample() -> Self {
        ProjectFinancials {
            project_name:
                "Dayuan Village redevelopment, phase II - urban renewal and environment design, lot 1"
                    .to_string(),
            project_no: "PRJ-SZ-2024-001".to_string(),
            project_belonging:
                "China Housing Design Group - Shenzhen Branch - Division One - Design Center"
                    .to_string(),
            total_amount: 3_000_000.00,
            invoiced_amount: 1_850_000.00,
            received_amount: 1_200_000.00,
            accumulated_sub_settlement: 800_000.00,
            available_funds: 400_000.00,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_figures_are_consistent() {
        let project = ProjectFinancials::sample();
        assert!(project.available_funds <= project.total_amount);
        assert!(project.invoiced_amount <= project.total_amount);
    }
}
