// Settlement Workbench - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod calculator;
pub mod deductions;
pub mod document;
pub mod entities;
pub mod narrative;
pub mod solver;
pub mod workbench;

// Re-export commonly used types
pub use calculator::{
    compute_financials, extract_tax, gross_up, DeductionMode, DerivedFinancials, EstimationParams,
    EstimationScenario, PERMITTED_TAX_RATES,
};
pub use deductions::{
    total_deductions, DeductionItem, DeductionKind, DeductionLedger, DeductionLine,
};
pub use document::{
    parse_narrative, render_plain, render_settlement_document, NarrativeBlock, Span,
};
pub use entities::{ProjectFinancials, SubcontractInfo};
pub use narrative::{
    fallback_narrative, format_currency, GeminiNarrativeProvider, NarrativeProvider,
    NarrativeRequest,
};
pub use solver::{infer_ratio_from_general_amount, infer_ratio_from_special_amount};
pub use workbench::{
    CurrentSettlement, NarrativeSource, NarrativeStatus, NarrativeTicket, WorkbenchController,
    WorkbenchStep,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
