//! Result Formatter
//!
//! Turns aggregate numbers into display strings and assembles the text answers
//! returned to users. Every answer also carries its headline metrics as
//! label/display pairs, which the report exporter reads back.
//!
//! # Conventions
//! - Counts: thousands separators (`1,234`)
//! - Money: dollar sign, two decimals (`$1,234.56`, `-$12.00`)
//! - Quantities: whole units with separators (`1,235 units`)
//! - Dates: `YYYY-MM-DD`, `N/A` when absent or unparseable

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write as _;

use crate::company::CompanyId;
use crate::router::Operation;

/// Insert thousands separators into an integer
#[must_use]
pub fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if n < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Fixed-point number with thousands separators in the integer part
#[must_use]
pub fn decimal(value: f64, places: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let rendered = format!("{:.*}", places, value.abs());

    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (rendered.as_str(), None),
    };

    // Integer part fits i64 for any realistic ledger total
    let grouped = int_part.parse::<i64>().map_or_else(|_| int_part.to_string(), thousands);
    let sign = if value < 0.0 && rendered.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Dollar amount with two decimals
#[must_use]
pub fn currency(amount: f64) -> String {
    let body = decimal(amount, 2);
    match body.strip_prefix('-') {
        Some(positive) => format!("-${positive}"),
        None => format!("${body}"),
    }
}

/// Whole units, rounded
#[must_use]
pub fn units(quantity: f64) -> String {
    format!("{} units", decimal(quantity, 0))
}

/// Percentage with one decimal
#[must_use]
pub fn percent(ratio_percent: f64) -> String {
    format!("{}%", decimal(ratio_percent, 1))
}

/// Millions with one decimal (`$1.2M`)
#[must_use]
pub fn millions(amount: f64) -> String {
    format!("${}M", decimal(amount / 1_000_000.0, 1))
}

/// Date portion of a database value as `YYYY-MM-DD`
#[must_use]
pub fn date(value: &serde_json::Value) -> String {
    value
        .as_str()
        .and_then(|s| s.get(..10))
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .map_or_else(|| "N/A".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

/// A labelled headline number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub label: String,
    pub display: String,
}

/// What an answer represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// Data pulled from the store
    Report,
    /// Static procedural guide
    Guide,
    /// The query ran but found nothing for the company
    NoData,
    /// Capabilities overview
    Help,
    /// Fixed message for a recognized but unsupported request
    Notice,
    /// Something failed; the text says what
    Error,
}

/// A finished, user-facing reply
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub kind: AnswerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Metric>,
}

impl Answer {
    /// Plain message with no metrics
    pub fn message(kind: AnswerKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            operation: None,
            company_id: None,
            text: text.into(),
            metrics: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    #[must_use]
    pub fn for_company(mut self, company: CompanyId) -> Self {
        self.company_id = Some(company);
        self
    }

    /// Display string of the metric with this label
    #[must_use]
    pub fn metric(&self, label: &str) -> Option<&str> {
        self.metrics.iter().find(|m| m.label == label).map(|m| m.display.as_str())
    }
}

enum Line {
    Metric(Metric),
    Text(String),
}

struct Section {
    heading: String,
    lines: Vec<Line>,
}

/// Builder for multi-section text answers
pub struct ReportBuilder {
    title: String,
    sections: Vec<Section>,
    footer: Option<String>,
}

impl ReportBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
            footer: None,
        }
    }

    /// Start a new section; following lines belong to it
    #[must_use]
    pub fn section(mut self, heading: impl Into<String>) -> Self {
        self.sections.push(Section {
            heading: heading.into(),
            lines: Vec::new(),
        });
        self
    }

    /// `- Label: display` line, also recorded as a metric
    #[must_use]
    pub fn metric(self, label: impl Into<String>, display: impl Into<String>) -> Self {
        self.push(Line::Metric(Metric {
            label: label.into(),
            display: display.into(),
        }))
    }

    /// Free-form line
    #[must_use]
    pub fn line(self, text: impl Into<String>) -> Self {
        self.push(Line::Text(text.into()))
    }

    #[must_use]
    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    fn push(mut self, line: Line) -> Self {
        if self.sections.is_empty() {
            self.sections.push(Section {
                heading: String::new(),
                lines: Vec::new(),
            });
        }
        if let Some(section) = self.sections.last_mut() {
            section.lines.push(line);
        }
        self
    }

    /// Render into an [`Answer`] of kind [`AnswerKind::Report`]
    #[must_use]
    pub fn build(self, operation: Operation, company: CompanyId) -> Answer {
        let mut text = format!("**{}**\n", self.title);
        let mut metrics = Vec::new();

        for section in self.sections {
            text.push('\n');
            if !section.heading.is_empty() {
                let _ = writeln!(text, "**{}:**", section.heading);
            }
            for line in section.lines {
                match line {
                    Line::Metric(metric) => {
                        let _ = writeln!(text, "- {}: {}", metric.label, metric.display);
                        metrics.push(metric);
                    }
                    Line::Text(body) => {
                        let _ = writeln!(text, "{body}");
                    }
                }
            }
        }

        if let Some(footer) = self.footer {
            let _ = write!(text, "\n*{footer}*\n");
        }

        Answer {
            kind: AnswerKind::Report,
            operation: Some(operation),
            company_id: Some(company),
            text,
            metrics,
        }
    }
}
