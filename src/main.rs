// Settlement Workbench - CLI walkthrough
// Steps through the seeded demo session: context review, deduction
// configuration, tax-mix estimation, and the final document preview with
// an audit narrative (real provider when GEMINI_API_KEY is set, local
// fallback otherwise).

use anyhow::Result;
use settlement_workbench::{
    format_currency, render_settlement_document, DeductionKind, EstimationScenario,
    GeminiNarrativeProvider, NarrativeSource, NarrativeStatus, WorkbenchController,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "settlement_workbench=info".into()),
        )
        .init();

    let mut controller = WorkbenchController::sample();

    println!("🧭 Subcontract Settlement Workbench v{}", settlement_workbench::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Step 1: context review
    step_banner(1, "Context review");
    print_context(&controller);
    controller.next_step();

    // Step 2: deduction configuration
    step_banner(2, "Deduction setup");
    print_deductions(&mut controller);
    controller.next_step();

    // Step 3: tax-mix estimation
    step_banner(3, "Tax estimation");
    print_estimation(&mut controller);
    controller.next_step();

    // Step 4: document preview with audit narrative
    step_banner(4, "Document preview");
    let status = match env::var("GEMINI_API_KEY") {
        Ok(api_key) if !api_key.is_empty() => {
            println!("  Requesting audit narrative from provider...");
            let provider = GeminiNarrativeProvider::new(api_key);
            controller.ensure_narrative(&provider).await
        }
        _ => {
            println!("  GEMINI_API_KEY not set, using the local fallback narrative.");
            controller
                .ensure_narrative(&AlwaysFallback)
                .await
        }
    };

    let (narrative, source) = match status {
        NarrativeStatus::Settled { text, source } => (text, source),
        // ensure_narrative always settles; this arm is unreachable in practice
        _ => unreachable!("narrative must settle"),
    };
    println!(
        "  Narrative source: {}\n",
        match source {
            NarrativeSource::Provider => "external provider",
            NarrativeSource::Fallback => "deterministic fallback",
        }
    );

    let financials = controller.financials();
    let document = render_settlement_document(
        controller.project(),
        controller.subcontract(),
        &controller.settlement().settlement_no,
        controller.settlement().settlement_amount,
        &controller.settlement().deductions,
        &financials,
        controller.scenario(),
        &narrative,
    );

    println!("{}", document);

    controller.submit();
    println!("✅ Settlement submitted for audit review.");

    Ok(())
}

/// Provider stand-in that always fails, so `ensure_narrative` takes the
/// fallback path without touching the network.
struct AlwaysFallback;

#[async_trait::async_trait]
impl settlement_workbench::NarrativeProvider for AlwaysFallback {
    async fn analyze(
        &self,
        _request: &settlement_workbench::NarrativeRequest,
    ) -> Result<String> {
        anyhow::bail!("no provider configured")
    }
}

fn step_banner(n: usize, label: &str) {
    println!("\n📍 Step {}: {}", n, label);
    println!("──────────────────────────────────────────────");
}

fn print_context(controller: &WorkbenchController) {
    let project = controller.project();
    let subcontract = controller.subcontract();

    println!("  Project:          {}", project.project_name);
    println!("  Project no:       {}", project.project_no);
    println!("  Contract amount:  {}", format_currency(project.total_amount));
    println!("  Available funds:  {}", format_currency(project.available_funds));
    println!("  Subcontract:      {}", subcontract.contract_name);
    println!("  Vendor:           {}", subcontract.vendor_name);
    println!("  Unsettled:        {}", format_currency(subcontract.unsettled_amount));
}

fn print_deductions(controller: &mut WorkbenchController) {
    let amount = controller.settlement().settlement_amount;
    println!("  Declared settlement amount: {}", format_currency(amount));

    for line in controller.settlement().deductions.breakdown(amount) {
        let basis = match line.kind {
            DeductionKind::Rate => format!("{:.2}%", line.value * 100.0),
            DeductionKind::Fixed => "fixed".to_string(),
        };
        let state = if line.is_active { " " } else { "·" };
        println!(
            "  {} {:<40} {:>8}  -{}",
            state,
            line.label,
            basis,
            format_currency(line.applied)
        );
    }

    let fin = controller.financials();
    println!("  Total deductions: {}", format_currency(fin.total_deductions));
    println!("  Base payable:     {}", format_currency(fin.base_payable));
}

fn print_estimation(controller: &mut WorkbenchController) {
    for scenario in [
        EstimationScenario::Special,
        EstimationScenario::General,
        EstimationScenario::Mixed,
    ] {
        controller.set_scenario(scenario);
        let fin = controller.financials();
        println!(
            "  {:<8}  special {:>14}  general {:>14}  credit {:>12}  net {:>14}",
            scenario.as_str(),
            format_currency(fin.special_amt),
            format_currency(fin.general_amt),
            format_currency(fin.total_input_tax_deduction),
            format_currency(fin.net_payable)
        );
    }

    // Reverse-solve demo: pin the special amount, let the ratio follow.
    controller.set_scenario(EstimationScenario::Mixed);
    let base = controller.financials().base_payable;
    let edited_special = base * 0.3 * 1.06;
    controller.edit_mixed_special_amount(edited_special);
    println!(
        "  Edited special amount {} -> mixed ratio {:.1}%",
        format_currency(edited_special),
        controller.params().mixed_special_ratio * 100.0
    );

    // Settle on the full-special scenario for the document preview.
    controller.set_scenario(EstimationScenario::Special);
}
