// 🧭 Workbench Controller - Owns the settlement session state
//
// One controller per session. All computation is synchronous and pure;
// the only awaited operation is the narrative provider call, which is
// guarded by an explicit in-flight state so a second trigger is a no-op
// and a result settles exactly once.

use crate::calculator::{
    compute_financials, DeductionMode, DerivedFinancials, EstimationParams, EstimationScenario,
};
use crate::deductions::DeductionLedger;
use crate::entities::{ProjectFinancials, SubcontractInfo};
use crate::narrative::{fallback_narrative, NarrativeProvider, NarrativeRequest};
use crate::solver::{infer_ratio_from_general_amount, infer_ratio_from_special_amount};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

// ============================================================================
// CURRENT SETTLEMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSettlement {
    pub settlement_no: String,

    /// Funds the project still has available for settlement
    pub project_settlable_amount: f64,

    /// Declared settlement amount for this round (tax inclusive)
    pub settlement_amount: f64,

    pub deductions: DeductionLedger,
}

impl CurrentSettlement {
    /// Demo settlement used by the CLI walkthrough.
    pub fn sample() -> Self {
        CurrentSettlement {
            settlement_no: "FBJS-2024-1025-001".to_string(),
            project_settlable_amount: 400_000.00,
            settlement_amount: 250_000.00,
            deductions: DeductionLedger::standard(),
        }
    }
}

// ============================================================================
// STEP STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkbenchStep {
    /// Review project/subcontract context
    Review,

    /// Configure deduction items
    Deductions,

    /// Simulate the input-tax scenarios
    TaxEstimation,

    /// Preview the generated document + audit narrative
    Preview,
}

impl WorkbenchStep {
    pub fn next(self) -> WorkbenchStep {
        match self {
            WorkbenchStep::Review => WorkbenchStep::Deductions,
            WorkbenchStep::Deductions => WorkbenchStep::TaxEstimation,
            WorkbenchStep::TaxEstimation => WorkbenchStep::Preview,
            WorkbenchStep::Preview => WorkbenchStep::Preview,
        }
    }

    pub fn prev(self) -> WorkbenchStep {
        match self {
            WorkbenchStep::Review => WorkbenchStep::Review,
            WorkbenchStep::Deductions => WorkbenchStep::Review,
            WorkbenchStep::TaxEstimation => WorkbenchStep::Deductions,
            WorkbenchStep::Preview => WorkbenchStep::TaxEstimation,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkbenchStep::Review => "Context review",
            WorkbenchStep::Deductions => "Deduction setup",
            WorkbenchStep::TaxEstimation => "Tax estimation",
            WorkbenchStep::Preview => "Document preview",
        }
    }
}

// ============================================================================
// NARRATIVE STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeSource {
    /// Text came from the external provider
    Provider,

    /// Text came from the local deterministic fallback
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
enum NarrativeState {
    Idle,
    InFlight {
        fingerprint: String,
    },
    Settled {
        fingerprint: String,
        text: String,
        source: NarrativeSource,
    },
}

/// Observable narrative status, detached from internal bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeStatus {
    Idle,
    InFlight,
    Settled { text: String, source: NarrativeSource },
}

/// Handle returned by `begin_narrative`: the request to send out plus
/// the fingerprint the completion must echo back.
#[derive(Debug, Clone)]
pub struct NarrativeTicket {
    pub fingerprint: String,
    pub request: NarrativeRequest,
}

// ============================================================================
// CONTROLLER
// ============================================================================

pub struct WorkbenchController {
    project: ProjectFinancials,
    subcontract: SubcontractInfo,
    settlement: CurrentSettlement,
    mode: DeductionMode,
    scenario: EstimationScenario,
    params: EstimationParams,
    step: WorkbenchStep,
    submitted: bool,
    narrative: NarrativeState,

    /// Last derivation, keyed by the input fingerprint. Self-invalidating:
    /// any mutation changes the fingerprint, so no explicit dirty flag.
    memo: Option<(String, DerivedFinancials)>,
}

impl WorkbenchController {
    pub fn new(
        project: ProjectFinancials,
        subcontract: SubcontractInfo,
        settlement: CurrentSettlement,
    ) -> Self {
        WorkbenchController {
            project,
            subcontract,
            settlement,
            mode: DeductionMode::Estimated,
            scenario: EstimationScenario::Special,
            params: EstimationParams::default(),
            step: WorkbenchStep::Review,
            submitted: false,
            narrative: NarrativeState::Idle,
            memo: None,
        }
    }

    /// Controller over the seeded demo session.
    pub fn sample() -> Self {
        WorkbenchController::new(
            ProjectFinancials::sample(),
            SubcontractInfo::sample(),
            CurrentSettlement::sample(),
        )
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn project(&self) -> &ProjectFinancials {
        &self.project
    }

    pub fn subcontract(&self) -> &SubcontractInfo {
        &self.subcontract
    }

    pub fn settlement(&self) -> &CurrentSettlement {
        &self.settlement
    }

    pub fn mode(&self) -> DeductionMode {
        self.mode
    }

    pub fn scenario(&self) -> EstimationScenario {
        self.scenario
    }

    pub fn params(&self) -> &EstimationParams {
        &self.params
    }

    pub fn step(&self) -> WorkbenchStep {
        self.step
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    // ========================================================================
    // DERIVATION (memoized)
    // ========================================================================

    /// Fingerprint of everything the calculator depends on.
    /// Doubles as the narrative snapshot identity.
    fn snapshot_fingerprint(&self) -> String {
        let inputs = serde_json::json!({
            "settlement": self.settlement,
            "mode": self.mode,
            "scenario": self.scenario,
            "params": self.params,
        });
        let mut hasher = Sha256::new();
        hasher.update(inputs.to_string());
        format!("{:x}", hasher.finalize())
    }

    /// Derived financials for the current snapshot. Recomputed from
    /// scratch whenever any input changed, served from the memo otherwise.
    pub fn financials(&mut self) -> DerivedFinancials {
        let fingerprint = self.snapshot_fingerprint();
        if let Some((cached_fp, cached)) = &self.memo {
            if *cached_fp == fingerprint {
                return *cached;
            }
        }

        let financials = compute_financials(
            self.settlement.settlement_amount,
            self.settlement.deductions.items(),
            self.mode,
            self.scenario,
            &self.params,
        );
        debug!(fingerprint = %&fingerprint[..12], "recomputed derived financials");
        self.memo = Some((fingerprint, financials));
        financials
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    pub fn set_settlement_amount(&mut self, amount: f64) {
        self.settlement.settlement_amount = amount;
    }

    pub fn update_deduction_value(&mut self, id: &str, value: f64) {
        self.settlement.deductions.update_value(id, value);
    }

    pub fn set_deduction_active(&mut self, id: &str, active: bool) {
        self.settlement.deductions.set_active(id, active);
    }

    pub fn rename_deduction(&mut self, id: &str, label: &str) {
        self.settlement.deductions.rename(id, label);
    }

    /// Add a fresh custom deduction item, returning its id.
    pub fn add_deduction(&mut self) -> String {
        self.settlement.deductions.add_custom()
    }

    pub fn set_mode(&mut self, mode: DeductionMode) {
        self.mode = mode;
    }

    pub fn set_scenario(&mut self, scenario: EstimationScenario) {
        self.scenario = scenario;
    }

    pub fn set_tax_rate(&mut self, tax_rate: f64) {
        self.params.set_tax_rate(tax_rate);
    }

    pub fn set_mixed_special_ratio(&mut self, ratio: f64) {
        self.params.set_mixed_special_ratio(ratio);
    }

    // ========================================================================
    // REVERSE-SOLVER FEEDBACK
    // ========================================================================

    /// User edited the tax-inclusive special amount under Mixed: infer
    /// the ratio that produces it. Degenerate base keeps the current ratio.
    pub fn edit_mixed_special_amount(&mut self, value: f64) {
        let base_payable = self.financials().base_payable;
        if let Some(ratio) =
            infer_ratio_from_special_amount(value, base_payable, self.params.tax_rate)
        {
            self.params.set_mixed_special_ratio(ratio);
        }
    }

    /// Same feedback for an edited general (tax-exclusive) amount.
    pub fn edit_mixed_general_amount(&mut self, value: f64) {
        let base_payable = self.financials().base_payable;
        if let Some(ratio) = infer_ratio_from_general_amount(value, base_payable) {
            self.params.set_mixed_special_ratio(ratio);
        }
    }

    // ========================================================================
    // STEP NAVIGATION
    // ========================================================================

    pub fn next_step(&mut self) {
        self.step = self.step.next();
    }

    pub fn prev_step(&mut self) {
        self.step = self.step.prev();
    }

    pub fn submit(&mut self) {
        self.submitted = true;
    }

    pub fn reopen(&mut self) {
        self.submitted = false;
    }

    // ========================================================================
    // NARRATIVE LIFECYCLE
    // ========================================================================

    /// Request payload for the narrative provider: context plus the
    /// derived figures of the current snapshot.
    pub fn narrative_request(&mut self) -> NarrativeRequest {
        let financials = self.financials();
        NarrativeRequest {
            project: self.project.clone(),
            subcontract: self.subcontract.clone(),
            settlement_no: self.settlement.settlement_no.clone(),
            settlement_amount: self.settlement.settlement_amount,
            deductions: self
                .settlement
                .deductions
                .breakdown(self.settlement.settlement_amount),
            base_payable: financials.base_payable,
            total_input_tax_deduction: financials.total_input_tax_deduction,
            net_payable: financials.net_payable,
        }
    }

    /// Start a narrative request if none is in flight and none is settled.
    /// Returns `None` otherwise: a second trigger is a no-op, and a
    /// settled narrative is sticky until `reset_narrative`.
    pub fn begin_narrative(&mut self) -> Option<NarrativeTicket> {
        match &self.narrative {
            NarrativeState::InFlight { .. } => {
                debug!("narrative request already in flight");
                None
            }
            NarrativeState::Settled { .. } => None,
            NarrativeState::Idle => {
                let fingerprint = self.snapshot_fingerprint();
                let request = self.narrative_request();
                self.narrative = NarrativeState::InFlight {
                    fingerprint: fingerprint.clone(),
                };
                Some(NarrativeTicket {
                    fingerprint,
                    request,
                })
            }
        }
    }

    /// Settle the in-flight request exactly once. Completions that arrive
    /// when nothing is in flight, or that echo a stale fingerprint, are
    /// discarded.
    pub fn complete_narrative(&mut self, fingerprint: &str, text: String, source: NarrativeSource) {
        match &self.narrative {
            NarrativeState::InFlight {
                fingerprint: current,
            } if current == fingerprint => {
                self.narrative = NarrativeState::Settled {
                    fingerprint: fingerprint.to_string(),
                    text,
                    source,
                };
            }
            _ => {
                warn!("narrative completion discarded: no matching in-flight request");
            }
        }
    }

    /// Explicit invalidation: the next `begin_narrative` will re-invoke.
    pub fn reset_narrative(&mut self) {
        self.narrative = NarrativeState::Idle;
    }

    pub fn narrative_status(&self) -> NarrativeStatus {
        match &self.narrative {
            NarrativeState::Idle => NarrativeStatus::Idle,
            NarrativeState::InFlight { .. } => NarrativeStatus::InFlight,
            NarrativeState::Settled { text, source, .. } => NarrativeStatus::Settled {
                text: text.clone(),
                source: *source,
            },
        }
    }

    /// Run the provider-with-fallback policy end to end: at most one
    /// invocation per snapshot, fallback substitution on failure, and a
    /// settled state in every outcome (never a stuck in-flight).
    pub async fn ensure_narrative<P>(&mut self, provider: &P) -> NarrativeStatus
    where
        P: NarrativeProvider + ?Sized,
    {
        if let Some(ticket) = self.begin_narrative() {
            let (text, source) = match provider.analyze(&ticket.request).await {
                Ok(text) => (text, NarrativeSource::Provider),
                Err(err) => {
                    warn!(error = %err, "narrative provider failed, substituting fallback");
                    (fallback_narrative(&ticket.request), NarrativeSource::Fallback)
                }
            };
            self.complete_narrative(&ticket.fingerprint, text, source);
        }
        self.narrative_status()
    }
}

// ============================================================================
// TESTS
// ============================================================================
