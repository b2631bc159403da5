//! Combined CSV report
//!
//! Flat summary built from the headline metrics of the sales, cash-flow and
//! inventory summaries. A section whose summary failed keeps its header and
//! records the reason in place of the numbers.

use chrono::{DateTime, Local};
use std::fmt::Write as _;

use crate::assistant::Assistant;
use crate::company::CompanyId;
use crate::engine::Connector;
use crate::format::{Answer, AnswerKind};
use crate::router::Operation;

/// Sections in output order: heading, summary operation, metric labels
const SECTIONS: [(&str, Operation, &[&str]); 3] = [
    ("SALES METRICS", Operation::SalesSummary, &["Total Invoices", "Total Revenue"]),
    (
        "CASH FLOW METRICS",
        Operation::CashflowSummary,
        &["Total Transactions", "Total Cash Inflows"],
    ),
    ("INVENTORY METRICS", Operation::InventorySummary, &["Total Products"]),
];

/// Run the three summaries and render the CSV
pub async fn generate<C: Connector>(assistant: &mut Assistant<C>, company: CompanyId) -> String {
    let mut answers = Vec::with_capacity(SECTIONS.len());
    for (_, operation, _) in SECTIONS {
        answers.push(assistant.answer(operation, company).await);
    }
    render(company, &answers, Local::now())
}

/// Render already computed summaries, in [`SECTIONS`] order
#[must_use]
pub fn render(company: CompanyId, answers: &[Answer], generated: DateTime<Local>) -> String {
    let mut csv = format!("ERP Report - Company {company}\n");
    let _ = writeln!(csv, "Generated: {}", generated.format("%Y-%m-%d %H:%M:%S"));

    for ((heading, _, labels), answer) in SECTIONS.iter().zip(answers) {
        let _ = write!(csv, "\n{heading}\nMetric,Value\n");

        if answer.kind != AnswerKind::Report {
            let _ = writeln!(csv, "Note,{}", csv_field(&answer.text));
            continue;
        }

        for label in *labels {
            if let Some(display) = answer.metric(label) {
                let _ = writeln!(csv, "{label},{}", plain_number(display));
            }
        }
    }

    csv
}

/// Strip currency symbols and thousands separators (`$1,234.50` -> `1234.50`)
fn plain_number(display: &str) -> String {
    display.chars().filter(|c| *c != '$' && *c != ',').collect()
}

/// Quote a free-text field when it would break the row
fn csv_field(text: &str) -> String {
    let single_line = text.trim().replace('\n', " ");
    if single_line.contains([',', '"']) {
        format!("\"{}\"", single_line.replace('"', "\"\""))
    } else {
        single_line
    }
}
