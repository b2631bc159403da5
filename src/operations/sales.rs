//! Sales operations

use crate::company::CompanyId;
use crate::connection::ConnectionManager;
use crate::engine::Connector;
use crate::error::Result;
use crate::format::{self, Answer, AnswerKind, ReportBuilder};
use crate::operations::{aggregate_row, listing_rows, RowExt};
use crate::router::Operation;

const SUMMARY_SQL: &str = "
    SELECT COUNT(DISTINCT sales_invoice.invoice_id)  AS total_invoices,
           SUM(sales_items.total)                    AS total_revenue,
           AVG(sales_items.total)                    AS avg_invoice_value,
           COUNT(DISTINCT sales_invoice.customer_id) AS unique_customers,
           MAX(sales_invoice.invoice_date)           AS latest_invoice,
           SUM(sales_items.quantity)                 AS total_units_sold
    FROM sales_items
             LEFT JOIN sales_invoice ON sales_invoice.invoice_id = sales_items.invoice_id
    WHERE sales_items.company_id = ?
      AND sales_invoice.status IN ('unpaid', 'paid', 'remaining')";

const FORECAST_SQL: &str = "
    SELECT sales_invoice.invoice_date AS issue_date,
           sales_items.total,
           sales_items.quantity
    FROM sales_items
             LEFT JOIN sales_invoice ON sales_invoice.invoice_id = sales_items.invoice_id
    WHERE sales_items.company_id = ?
      AND sales_invoice.status IN ('unpaid', 'paid', 'remaining')
    ORDER BY sales_invoice.invoice_date DESC
    LIMIT 100";

const REGIONAL_SQL: &str = "
    SELECT origins.title                            AS region,
           COUNT(DISTINCT sales_invoice.invoice_id) AS invoice_count,
           SUM(sales_items.total)                   AS regional_revenue,
           SUM(sales_items.quantity)                AS units_sold,
           AVG(sales_items.total)                   AS avg_order_value
    FROM sales_items
             LEFT JOIN sales_invoice ON sales_invoice.invoice_id = sales_items.invoice_id
             LEFT JOIN contacts ON contacts.contact_id = sales_invoice.customer_id
             LEFT JOIN origins ON origins.id = contacts.region
    WHERE sales_items.company_id = ?
      AND sales_invoice.status IN ('unpaid', 'paid', 'remaining')
    GROUP BY origins.title
    ORDER BY regional_revenue DESC";

const PRODUCTS_SQL: &str = "
    SELECT sales_items.product_id,
           SUM(sales_items.quantity)                AS total_sold,
           SUM(sales_items.total)                   AS total_revenue,
           AVG(sales_items.price)                   AS avg_price,
           COUNT(DISTINCT sales_invoice.invoice_id) AS order_count
    FROM sales_items
             LEFT JOIN sales_invoice ON sales_invoice.invoice_id = sales_items.invoice_id
    WHERE sales_items.company_id = ?
      AND sales_invoice.status IN ('unpaid', 'paid', 'remaining')
    GROUP BY sales_items.product_id
    ORDER BY total_revenue DESC
    LIMIT 15";

/// Window used to turn the recent sample into a daily rate
const FORECAST_WINDOW_DAYS: usize = 30;

pub async fn summary<C: Connector>(
    db: &mut ConnectionManager<C>,
    company: CompanyId,
) -> Result<Answer> {
    let result = db.execute(SUMMARY_SQL, &[company.param()]).await?;
    let row = aggregate_row(&result, || format!("No sales data found for company {company}"))?;

    Ok(ReportBuilder::new(format!("Sales Performance Summary - Company {company}"))
        .section("Key Metrics")
        .metric("Total Invoices", format::thousands(row.count("total_invoices")))
        .metric("Total Revenue", format::currency(row.number("total_revenue")))
        .metric("Average Invoice Value", format::currency(row.number("avg_invoice_value")))
        .metric("Unique Customers", format::thousands(row.count("unique_customers")))
        .metric("Total Units Sold", format::decimal(row.number("total_units_sold"), 0))
        .metric("Latest Activity", format::date(row.raw("latest_invoice")))
        .footer("Live data from the ERP database")
        .build(Operation::SalesSummary, company))
}

/// Revenue projection from the most recent line items.
///
/// average daily = sample revenue / min(30, sample size); monthly = daily x 30
pub async fn forecast<C: Connector>(
    db: &mut ConnectionManager<C>,
    company: CompanyId,
) -> Result<Answer> {
    let result = db.execute(FORECAST_SQL, &[company.param()]).await?;
    let rows = listing_rows(&result, || {
        format!("No sales data available for forecasting for company {company}")
    })?;

    let sample_revenue: f64 = rows.iter().map(|row| row.number("total")).sum();
    let avg_daily = sample_revenue / rows.len().min(FORECAST_WINDOW_DAYS) as f64;
    let monthly = avg_daily * FORECAST_WINDOW_DAYS as f64;

    Ok(ReportBuilder::new(format!("Sales Forecasting Analysis - Company {company}"))
        .section("Revenue Projections")
        .metric("Recent Sample Revenue", format::currency(sample_revenue))
        .metric("Estimated Monthly Revenue", format::currency(monthly))
        .metric("Average Daily Revenue", format::currency(avg_daily))
        .metric("Analysis Period", format!("{} recent transactions", rows.len()))
        .metric("Latest Sale", format::date(rows[0].raw("issue_date")))
        .footer("Projection based on recent sales history")
        .build(Operation::SalesForecast, company))
}

pub async fn regional<C: Connector>(
    db: &mut ConnectionManager<C>,
    company: CompanyId,
) -> Result<Answer> {
    let result = db.execute(REGIONAL_SQL, &[company.param()]).await?;
    let rows =
        listing_rows(&result, || format!("No regional sales data found for company {company}"))?;

    let mut report = ReportBuilder::new(format!("Regional Sales Performance - Company {company}"))
        .section("Performance by Region")
        .metric("Regions", rows.len().to_string());

    for (i, row) in rows.iter().enumerate() {
        report = report
            .line(format!(
                "{}. **{}**: {} ({} orders, {} units)",
                i + 1,
                row.label("region", "Unassigned"),
                format::currency(row.number("regional_revenue")),
                format::thousands(row.count("invoice_count")),
                format::decimal(row.number("units_sold"), 0),
            ))
            .line(format!("   Average Order: {}", format::currency(row.number("avg_order_value"))));
    }

    Ok(report.build(Operation::RegionalSales, company))
}

/// Top products by revenue; serves both product and top-product requests
pub async fn products<C: Connector>(
    db: &mut ConnectionManager<C>,
    company: CompanyId,
    operation: Operation,
) -> Result<Answer> {
    let result = db.execute(PRODUCTS_SQL, &[company.param()]).await?;
    let rows =
        listing_rows(&result, || format!("No product sales data found for company {company}"))?;

    let mut report = ReportBuilder::new(format!("Product Sales Analysis - Company {company}"))
        .section("Top Performing Products")
        .metric("Products Listed", rows.len().to_string());

    for (i, row) in rows.iter().enumerate() {
        report = report
            .line(format!("{}. **Product {}**:", i + 1, row.label("product_id", "?")))
            .line(format!("   Revenue: {}", format::currency(row.number("total_revenue"))))
            .line(format!("   Units Sold: {}", format::decimal(row.number("total_sold"), 0)))
            .line(format!("   Average Price: {}", format::currency(row.number("avg_price"))))
            .line(format!("   Orders: {}", format::thousands(row.count("order_count"))));
    }

    Ok(report.build(operation, company))
}

/// Static walkthrough; touches no data
#[must_use]
pub fn invoice_creation_guide(company: CompanyId) -> Answer {
    let text = format!(
        "**Sales Invoice Creation Guide**

This guide helps you create Sales Invoices for **Company {company}**.

**Navigation:** Sales > Sale Invoice > New > Sale Invoice

**Prerequisites:**
1. The customer exists in the system
2. Product or service items are created
3. Stock is available (for inventory items)
4. Taxes and discounts are configured
5. Optional: a Sales Order or Delivery Note exists

**Steps:**
1. Open the Sales Invoice form
2. Select the customer; address, payment terms and currency load automatically
3. Set the invoice date, due date and warehouse
4. Add at least one item with product, quantity, rate and warehouse
5. Add shipping charges, service fees or discounts if needed
6. Add notes or payment terms if needed
7. Save as draft, or submit to create the accounting and stock entries

**Mandatory fields:** customer, invoice date, due date, at least one item, quantity,
rate, warehouse (stock items), payment method (paid invoices)

**System checks:** customer credit limit, warehouse stock levels, zero rate or
amount, posting date within an open period, customer vs. invoice currency

**Common errors:**
- Missing required field: fill the highlighted field
- Insufficient stock: pick another warehouse or adjust the quantity
- Invoice not submitted: click Submit after saving
- Credit limit exceeded: contact the finance department
- Invalid date: pick a date inside an open accounting period

*Based on the standard ERP configuration. Company {company} may have specific settings.*
"
    );

    Answer::message(AnswerKind::Guide, text)
        .with_operation(Operation::InvoiceCreationGuide)
        .for_company(company)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DatabaseType;

    #[test]
    fn test_guide_mentions_company() {
        let answer = invoice_creation_guide(CompanyId::new(1387).unwrap());
        assert_eq!(answer.kind, AnswerKind::Guide);
        assert_eq!(answer.operation, Some(Operation::InvoiceCreationGuide));
        assert!(answer.text.contains("Company 1387"));
        assert!(answer.metrics.is_empty());
    }

    #[test]
    fn test_queries_pass_guard() {
        for sql in [SUMMARY_SQL, FORECAST_SQL, REGIONAL_SQL, PRODUCTS_SQL] {
            for engine in [DatabaseType::MySQL, DatabaseType::SQLite] {
                assert!(crate::guard::check(sql, engine).is_ok());
            }
            assert_eq!(sql.matches('?').count(), 1);
        }
    }
}
