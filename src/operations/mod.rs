//! Query Operations
//!
//! One function per [`Operation`]. Each issues a single fixed, parameterized
//! query scoped by company and formats the rows into an [`Answer`].
//!
//! # Empty results
//! No rows, or an aggregate row whose values are all null or zero, produce
//! `AppError::NoData` with a "No ... found for company X" message. Nullable
//! aggregates are read through [`RowExt`], which coalesces them to zero.

pub mod cashflow;
pub mod inventory;
pub mod sales;

use tracing::debug;

use crate::company::CompanyId;
use crate::connection::ConnectionManager;
use crate::engine::{Connector, QueryResult, Row};
use crate::error::{AppError, Result};
use crate::format::Answer;
use crate::router::Operation;

/// Run `operation` for `company`
pub async fn run<C: Connector>(
    db: &mut ConnectionManager<C>,
    operation: Operation,
    company: CompanyId,
) -> Result<Answer> {
    debug!(operation = %operation, company = %company, "running operation");

    match operation {
        Operation::SalesSummary => sales::summary(db, company).await,
        Operation::SalesForecast => sales::forecast(db, company).await,
        Operation::RegionalSales => sales::regional(db, company).await,
        Operation::ProductSales | Operation::TopProducts => {
            sales::products(db, company, operation).await
        }
        Operation::InvoiceCreationGuide => Ok(sales::invoice_creation_guide(company)),
        Operation::InventorySummary => inventory::summary(db, company).await,
        Operation::InventoryRisk => inventory::risk(db, company).await,
        Operation::LowStockItems => inventory::low_stock(db, company).await,
        Operation::OutOfStockItems => inventory::out_of_stock(db, company).await,
        Operation::ProductInventory => inventory::by_product(db, company).await,
        Operation::CashflowSummary => cashflow::summary(db, company).await,
        Operation::TransactionBreakdown => cashflow::breakdown(db, company).await,
    }
}

/// Typed reads over a result row
pub trait RowExt {
    /// Numeric value, `None` for null, missing or non-numeric
    fn number_opt(&self, column: &str) -> Option<f64>;

    /// Numeric value with null coalesced to zero
    fn number(&self, column: &str) -> f64 {
        self.number_opt(column).unwrap_or(0.0)
    }

    /// Whole count with null coalesced to zero
    fn count(&self, column: &str) -> i64 {
        self.number(column).round() as i64
    }

    /// Display label for an identifier or name column
    fn label(&self, column: &str, fallback: &str) -> String;

    /// Raw value, null when the column is missing
    fn raw(&self, column: &str) -> &serde_json::Value;
}

static NULL: serde_json::Value = serde_json::Value::Null;

impl RowExt for Row {
    fn number_opt(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(value_as_f64)
    }

    fn label(&self, column: &str, fallback: &str) -> String {
        match self.get(column) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => fallback.to_string(),
        }
    }

    fn raw(&self, column: &str) -> &serde_json::Value {
        self.get(column).unwrap_or(&NULL)
    }
}

/// Numbers pass through; DECIMAL text is parsed
fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// True when every value in the row is null or numerically zero
fn is_blank(row: &Row) -> bool {
    row.values().all(|value| match value {
        serde_json::Value::Null => true,
        other => value_as_f64(other).is_some_and(|n| n == 0.0),
    })
}

/// First row of an aggregate query, or `NoData` when there is nothing to show
fn aggregate_row(result: &QueryResult, no_data: impl FnOnce() -> String) -> Result<&Row> {
    match result.first() {
        Some(row) if !is_blank(row) => Ok(row),
        _ => Err(AppError::no_data(no_data())),
    }
}

/// All rows of a listing query, or `NoData` when there are none
fn listing_rows(result: &QueryResult, no_data: impl FnOnce() -> String) -> Result<&[Row]> {
    if result.is_empty() {
        Err(AppError::no_data(no_data()))
    } else {
        Ok(&result.rows)
    }
}
