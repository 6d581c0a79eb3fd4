// 📄 Document - Narrative mini-format and settlement document rendering
//
// Mini-format consumed by the rendering layer:
//   '# '  line  -> top-level title
//   '## ' line  -> subsection title
//   blank line  -> paragraph break
//   **span**    -> emphasized text inside a paragraph
//
// The fallback narrative is produced in this shape, and provider output
// is parsed through the same model.

use crate::calculator::{DerivedFinancials, EstimationScenario};
use crate::deductions::{DeductionKind, DeductionLedger};
use crate::entities::{ProjectFinancials, SubcontractInfo};
use crate::narrative::format_currency;
use serde::{Deserialize, Serialize};

// ============================================================================
// BLOCK MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NarrativeBlock {
    Title { text: String },
    Subtitle { text: String },
    Paragraph { spans: Vec<Span> },
    Break,
}

// ============================================================================
// PARSER
// ============================================================================

/// Split a paragraph line into plain and bold spans on paired `**` markers.
fn parse_spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = line;

    while let Some(start) = rest.find("**") {
        if let Some(len) = rest[start + 2..].find("**") {
            if start > 0 {
                spans.push(Span {
                    text: rest[..start].to_string(),
                    bold: false,
                });
            }
            spans.push(Span {
                text: rest[start + 2..start + 2 + len].to_string(),
                bold: true,
            });
            rest = &rest[start + 2 + len + 2..];
        } else {
            // Unpaired marker: treat the remainder as plain text.
            break;
        }
    }

    if !rest.is_empty() {
        spans.push(Span {
            text: rest.to_string(),
            bold: false,
        });
    }

    spans
}

/// Parse narrative text into blocks, line by line.
pub fn parse_narrative(text: &str) -> Vec<NarrativeBlock> {
    text.lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                NarrativeBlock::Break
            } else if let Some(rest) = trimmed.strip_prefix("## ") {
                NarrativeBlock::Subtitle {
                    text: rest.trim().to_string(),
                }
            } else if let Some(rest) = trimmed.strip_prefix("# ") {
                NarrativeBlock::Title {
                    text: rest.trim().to_string(),
                }
            } else {
                NarrativeBlock::Paragraph {
                    spans: parse_spans(trimmed),
                }
            }
        })
        .collect()
}

/// Marker-stripped text for terminal preview. Titles are underlined,
/// bold spans rendered as-is.
pub fn render_plain(blocks: &[NarrativeBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            NarrativeBlock::Title { text } => {
                out.push_str(text);
                out.push('\n');
                out.push_str(&"=".repeat(text.chars().count()));
                out.push('\n');
            }
            NarrativeBlock::Subtitle { text } => {
                out.push_str(text);
                out.push('\n');
                out.push_str(&"-".repeat(text.chars().count()));
                out.push('\n');
            }
            NarrativeBlock::Paragraph { spans } => {
                for span in spans {
                    out.push_str(&span.text);
                }
                out.push('\n');
            }
            NarrativeBlock::Break => out.push('\n'),
        }
    }
    out
}

// ============================================================================
// SETTLEMENT DOCUMENT
// ============================================================================

/// Render the full settlement document: context sections, the itemized
/// settlement table, and the audit narrative appended at the end.
#[allow(clippy::too_many_arguments)]
pub fn render_settlement_document(
    project: &ProjectFinancials,
    subcontract: &SubcontractInfo,
    settlement_no: &str,
    settlement_amount: f64,
    ledger: &DeductionLedger,
    financials: &DerivedFinancials,
    scenario: EstimationScenario,
    narrative: &str,
) -> String {
    let mut doc = String::new();
    let line = "-".repeat(72);

    doc.push_str("SUBCONTRACT SETTLEMENT DOCUMENT\n");
    doc.push_str(&line);
    doc.push('\n');
    doc.push_str(&format!("Settlement no:   {}\n", settlement_no));
    doc.push_str(&format!(
        "Date:            {}\n",
        chrono::Utc::now().format("%Y-%m-%d")
    ));
    doc.push_str(&format!(
        "Net payable:     {}\n\n",
        format_currency(financials.net_payable)
    ));

    doc.push_str("PROJECT INFO\n");
    doc.push_str(&format!("  Name:            {}\n", project.project_name));
    doc.push_str(&format!("  No:              {}\n", project.project_no));
    doc.push_str(&format!("  Belonging:       {}\n", project.project_belonging));
    doc.push_str(&format!(
        "  Available funds: {}\n\n",
        format_currency(project.available_funds)
    ));

    doc.push_str("SUBCONTRACT INFO\n");
    doc.push_str(&format!("  Contract:        {}\n", subcontract.contract_name));
    doc.push_str(&format!("  Vendor:          {}\n", subcontract.vendor_name));
    doc.push_str(&format!(
        "  Contract amount: {}\n",
        format_currency(subcontract.contract_amount)
    ));
    doc.push_str(&format!(
        "  Unsettled:       {}\n\n",
        format_currency(subcontract.unsettled_amount)
    ));

    doc.push_str("SETTLEMENT TABLE\n");
    doc.push_str(&format!(
        "  Declared settlement amount (tax incl.)  {:>16}\n",
        format_currency(settlement_amount)
    ));
    for item in ledger.items().iter().filter(|item| item.is_active) {
        let basis = match item.kind {
            DeductionKind::Rate => format!("{:.2}%", item.value * 100.0),
            DeductionKind::Fixed => "fixed".to_string(),
        };
        doc.push_str(&format!(
            "    - {:<34} {:>7}  -{:>14}\n",
            item.label,
            basis,
            format_currency(item.applied(settlement_amount))
        ));
    }
    doc.push_str(&format!(
        "  Input-tax credit (scenario: {:<7})     +{:>15}\n",
        scenario.as_str(),
        format_currency(financials.total_input_tax_deduction)
    ));
    doc.push_str(&line);
    doc.push('\n');
    doc.push_str(&format!(
        "  NET PAYABLE TOTAL                       {:>16}\n\n",
        format_currency(financials.net_payable)
    ));

    doc.push_str("AUDIT INSIGHT\n");
    doc.push_str(&render_plain(&parse_narrative(narrative)));

    doc
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{
        compute_financials, DeductionMode, EstimationParams,
    };
    use crate::narrative::{fallback_narrative, NarrativeRequest};

    #[test]
    fn test_parse_titles_and_breaks() {
        let blocks = parse_narrative("# Report\n\n## Section One\nBody text.");

        assert_eq!(
            blocks,
            vec![
                NarrativeBlock::Title {
                    text: "Report".to_string()
                },
                NarrativeBlock::Break,
                NarrativeBlock::Subtitle {
                    text: "Section One".to_string()
                },
                NarrativeBlock::Paragraph {
                    spans: vec![Span {
                        text: "Body text.".to_string(),
                        bold: false
                    }]
                },
            ]
        );
    }

    #[test]
    fn test_parse_bold_spans() {
        let blocks = parse_narrative("amount is **165,300.00** today");
        let NarrativeBlock::Paragraph { spans } = &blocks[0] else {
            panic!("expected paragraph");
        };

        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].text, "amount is ");
        assert!(!spans[0].bold);
        assert_eq!(spans[1].text, "165,300.00");
        assert!(spans[1].bold);
        assert_eq!(spans[2].text, " today");
        assert!(!spans[2].bold);
    }

    #[test]
    fn test_unpaired_marker_stays_plain() {
        let blocks = parse_narrative("broken **emphasis here");
        let NarrativeBlock::Paragraph { spans } = &blocks[0] else {
            panic!("expected paragraph");
        };

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "broken **emphasis here");
        assert!(!spans[0].bold);
    }

    #[test]
    fn test_fallback_round_trips_through_parser() {
        let request = NarrativeRequest {
            project: ProjectFinancials::sample(),
            subcontract: SubcontractInfo::sample(),
            settlement_no: "FBJS-2024-1025-001".to_string(),
            settlement_amount: 250000.0,
            deductions: Vec::new(),
            base_payable: 165300.0,
            total_input_tax_deduction: 9918.0,
            net_payable: 175218.0,
        };

        let blocks = parse_narrative(&fallback_narrative(&request));

        let titles = blocks
            .iter()
            .filter(|b| matches!(b, NarrativeBlock::Title { .. }))
            .count();
        let subtitles = blocks
            .iter()
            .filter(|b| matches!(b, NarrativeBlock::Subtitle { .. }))
            .count();
        assert_eq!(titles, 1);
        assert_eq!(subtitles, 4);

        let plain = render_plain(&blocks);
        assert!(plain.contains("Subcontract Settlement Audit Report"));
        assert!(!plain.contains("**"));
        assert!(plain.contains("9,918.00"));
    }

    #[test]
    fn test_document_lists_only_active_items() {
        let project = ProjectFinancials::sample();
        let subcontract = SubcontractInfo::sample();
        let ledger = DeductionLedger::standard();
        let params = EstimationParams::new(0.06, 0.5);
        let financials = compute_financials(
            250000.0,
            ledger.items(),
            DeductionMode::Estimated,
            EstimationScenario::Special,
            &params,
        );

        let doc = render_settlement_document(
            &project,
            &subcontract,
            "FBJS-2024-1025-001",
            250000.0,
            &ledger,
            &financials,
            EstimationScenario::Special,
            "# Audit\nAll good.",
        );

        assert!(doc.contains("FBJS-2024-1025-001"));
        assert!(doc.contains("VAT (6%)"));
        // Bid bond is seeded inactive and must not show in the table.
        assert!(!doc.contains("Bid bond"));
        assert!(doc.contains("175,218.00"));
        assert!(doc.contains("scenario: special"));
    }
}
