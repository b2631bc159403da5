//! Cash-flow operations over voucher line items

use crate::company::CompanyId;
use crate::connection::ConnectionManager;
use crate::engine::Connector;
use crate::error::Result;
use crate::format::{self, Answer, ReportBuilder};
use crate::operations::{aggregate_row, RowExt};
use crate::router::Operation;

const SUMMARY_SQL: &str = "
    SELECT COUNT(*)                   AS transaction_count,
           SUM(COALESCE(credit, 0))   AS total_inflow,
           SUM(COALESCE(debit, 0))    AS total_outflow,
           COUNT(DISTINCT voucher_id) AS unique_vouchers
    FROM voucher_items
    WHERE company_id = ?";

const BREAKDOWN_SQL: &str = "
    SELECT COUNT(*)                   AS total_count,
           COUNT(DISTINCT voucher_id) AS voucher_count,
           SUM(COALESCE(credit, 0))   AS total_credit,
           SUM(COALESCE(debit, 0))    AS total_debit
    FROM voucher_items
    WHERE company_id = ?";

/// Direction of the net cash position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashStatus {
    /// |net| below one currency unit
    Balanced,
    NetPositive,
    NetNegative,
}

impl CashStatus {
    #[must_use]
    pub fn from_net(net: f64) -> Self {
        if net.abs() < 1.0 {
            Self::Balanced
        } else if net > 0.0 {
            Self::NetPositive
        } else {
            Self::NetNegative
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Balanced => "Balanced",
            Self::NetPositive => "Net Positive",
            Self::NetNegative => "Net Negative",
        }
    }
}

pub async fn summary<C: Connector>(
    db: &mut ConnectionManager<C>,
    company: CompanyId,
) -> Result<Answer> {
    let result = db.execute(SUMMARY_SQL, &[company.param()]).await?;
    let row = aggregate_row(&result, || format!("No cash flow data found for company {company}"))?;

    let transactions = row.count("transaction_count");
    let vouchers = row.count("unique_vouchers");
    let inflow = row.number("total_inflow");
    let outflow = row.number("total_outflow");
    let net = inflow - outflow;

    Ok(ReportBuilder::new(format!("Cash Flow Summary - Company {company}"))
        .section("Core Metrics")
        .metric("Total Transactions", format::thousands(transactions))
        .metric("Unique Vouchers", format::thousands(vouchers))
        .metric("Total Cash Inflows", format::currency(inflow))
        .metric("Total Cash Outflows", format::currency(outflow))
        .metric("Net Cash Position", format::currency(net))
        .metric("Financial Status", CashStatus::from_net(net).label())
        .section("Business Insights")
        .line(format!("- Processing {} in financial operations", format::millions(inflow)))
        .line(format!("- {} processed transactions", format::thousands(transactions)))
        .line(format!("- {} financial documents managed", format::thousands(vouchers)))
        .footer("Live data from the ERP database")
        .build(Operation::CashflowSummary, company))
}

pub async fn breakdown<C: Connector>(
    db: &mut ConnectionManager<C>,
    company: CompanyId,
) -> Result<Answer> {
    let result = db.execute(BREAKDOWN_SQL, &[company.param()]).await?;
    let row =
        aggregate_row(&result, || format!("No transaction data found for company {company}"))?;

    Ok(ReportBuilder::new(format!("Transaction Breakdown - Company {company}"))
        .section("Summary")
        .metric("Total Transactions", format::thousands(row.count("total_count")))
        .metric("Unique Vouchers", format::thousands(row.count("voucher_count")))
        .metric("Total Credit", format::currency(row.number("total_credit")))
        .metric("Total Debit", format::currency(row.number("total_debit")))
        .build(Operation::TransactionBreakdown, company))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DatabaseType;

    #[test]
    fn test_status_thresholds() {
        assert_eq!(CashStatus::from_net(0.0), CashStatus::Balanced);
        assert_eq!(CashStatus::from_net(0.99), CashStatus::Balanced);
        assert_eq!(CashStatus::from_net(-0.99), CashStatus::Balanced);
        assert_eq!(CashStatus::from_net(1.0), CashStatus::NetPositive);
        assert_eq!(CashStatus::from_net(-1.0), CashStatus::NetNegative);
    }

    #[test]
    fn test_queries_pass_guard() {
        for sql in [SUMMARY_SQL, BREAKDOWN_SQL] {
            for engine in [DatabaseType::MySQL, DatabaseType::SQLite] {
                assert!(crate::guard::check(sql, engine).is_ok());
            }
        }
    }
}
