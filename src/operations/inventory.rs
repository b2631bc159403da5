//! Inventory operations
//!
//! All queries look at purchase stock entries only (`stock_type = 'purchase'`).

use crate::company::CompanyId;
use crate::connection::ConnectionManager;
use crate::engine::{Connector, Row};
use crate::error::Result;
use crate::format::{self, Answer, ReportBuilder};
use crate::operations::{aggregate_row, listing_rows, RowExt};
use crate::router::Operation;

const SUMMARY_SQL: &str = "
    SELECT COUNT(DISTINCT product_id)   AS total_products,
           SUM(quantity)                AS total_quantity,
           AVG(quantity)                AS avg_quantity_per_product,
           COUNT(DISTINCT warehouse_id) AS total_warehouses
    FROM stock
    WHERE company_id = ?
      AND stock_type = 'purchase'";

const RISK_SQL: &str = "
    SELECT stock.product_id,
           stock.warehouse_id,
           stock.quantity,
           products.reorder_qty_alert,
           products.min_qty_alert,
           SUM(COALESCE(stock.cost, 0) + COALESCE(stock.overhead, 0)) AS cost,
           stock.stock_date
    FROM stock
             LEFT JOIN products ON products.product_id = stock.product_id
    WHERE stock.company_id = ?
      AND stock.stock_type = 'purchase'
    GROUP BY stock.stock_id
    LIMIT 50";

const LOW_STOCK_SQL: &str = "
    SELECT stock.product_id,
           stock.quantity,
           products.min_qty_alert,
           products.reorder_qty_alert,
           (products.min_qty_alert - stock.quantity) AS shortage,
           stock.warehouse_id
    FROM stock
             LEFT JOIN products ON products.product_id = stock.product_id
    WHERE stock.company_id = ?
      AND stock.quantity <= products.min_qty_alert
      AND stock.stock_type = 'purchase'
    ORDER BY shortage DESC
    LIMIT 15";

const OUT_OF_STOCK_SQL: &str = "
    SELECT stock.product_id,
           stock.warehouse_id,
           products.min_qty_alert,
           products.reorder_qty_alert
    FROM stock
             LEFT JOIN products ON products.product_id = stock.product_id
    WHERE stock.company_id = ?
      AND stock.quantity = 0
      AND stock.stock_type = 'purchase'
    ORDER BY stock.product_id
    LIMIT 15";

const BY_PRODUCT_SQL: &str = "
    SELECT product_id,
           SUM(quantity)                AS total_quantity,
           COUNT(DISTINCT warehouse_id) AS warehouse_count,
           AVG(quantity)                AS avg_quantity
    FROM stock
    WHERE company_id = ?
      AND stock_type = 'purchase'
    GROUP BY product_id
    ORDER BY total_quantity DESC
    LIMIT 15";

pub async fn summary<C: Connector>(
    db: &mut ConnectionManager<C>,
    company: CompanyId,
) -> Result<Answer> {
    let result = db.execute(SUMMARY_SQL, &[company.param()]).await?;
    let row = aggregate_row(&result, || format!("No inventory data found for company {company}"))?;

    Ok(ReportBuilder::new(format!("Inventory Overview - Company {company}"))
        .section("Stock Summary")
        .metric("Total Products", format::thousands(row.count("total_products")))
        .metric("Total Quantity in Stock", format::units(row.number("total_quantity")))
        .metric("Average per Product", format::units(row.number("avg_quantity_per_product")))
        .metric("Warehouse Locations", format::thousands(row.count("total_warehouses")))
        .footer("Live data from the ERP database")
        .build(Operation::InventorySummary, company))
}

/// Share of sampled stock entries at or below their minimum level
pub async fn risk<C: Connector>(
    db: &mut ConnectionManager<C>,
    company: CompanyId,
) -> Result<Answer> {
    let result = db.execute(RISK_SQL, &[company.param()]).await?;
    let rows = listing_rows(&result, || {
        format!("No inventory risk data available for company {company}")
    })?;

    let at_risk = rows.iter().filter(|row| is_at_or_below_minimum(row)).count();
    let total_cost: f64 = rows.iter().map(|row| row.number("cost")).sum();
    let risk_score = at_risk as f64 / rows.len() as f64 * 100.0;

    // ISO dates order lexicographically
    let latest = rows
        .iter()
        .map(|row| row.raw("stock_date"))
        .filter(|value| value.is_string())
        .max_by(|a, b| a.as_str().cmp(&b.as_str()))
        .map_or_else(|| "N/A".to_string(), format::date);

    Ok(ReportBuilder::new(format!("Inventory Risk Assessment - Company {company}"))
        .section("Risk Analysis")
        .metric("Products at Risk", format!("{at_risk} items at or below minimum levels"))
        .metric("Total Inventory Value", format::currency(total_cost))
        .metric("Risk Score", format::percent(risk_score))
        .metric("Items Monitored", format!("{} stock entries", rows.len()))
        .metric("Latest Stock Activity", latest)
        .footer("Analysis based on purchase stock entries")
        .build(Operation::InventoryRisk, company))
}

/// Entries without a configured minimum never count as at risk
fn is_at_or_below_minimum(row: &Row) -> bool {
    match (row.number_opt("quantity"), row.number_opt("min_qty_alert")) {
        (Some(quantity), Some(minimum)) => quantity <= minimum,
        _ => false,
    }
}

pub async fn low_stock<C: Connector>(
    db: &mut ConnectionManager<C>,
    company: CompanyId,
) -> Result<Answer> {
    let result = db.execute(LOW_STOCK_SQL, &[company.param()]).await?;
    let rows =
        listing_rows(&result, || format!("No low stock items found for company {company}"))?;

    let mut report = ReportBuilder::new(format!("Low Stock Alerts - Company {company}"))
        .section("Immediate Attention Required")
        .metric("Items Below Minimum", rows.len().to_string());

    for row in rows {
        report = report
            .line(format!(
                "**Product {}** (Warehouse {}):",
                row.label("product_id", "?"),
                row.label("warehouse_id", "?")
            ))
            .line(format!("   Current Stock: {}", format::units(row.number("quantity"))))
            .line(format!("   Minimum Required: {}", format::units(row.number("min_qty_alert"))))
            .line(format!("   Shortage: {}", format::units(row.number("shortage"))))
            .line(format!("   Reorder Point: {}", format::units(row.number("reorder_qty_alert"))));
    }

    Ok(report.build(Operation::LowStockItems, company))
}

pub async fn out_of_stock<C: Connector>(
    db: &mut ConnectionManager<C>,
    company: CompanyId,
) -> Result<Answer> {
    let result = db.execute(OUT_OF_STOCK_SQL, &[company.param()]).await?;
    let rows =
        listing_rows(&result, || format!("No out of stock items found for company {company}"))?;

    let mut report = ReportBuilder::new(format!("Out of Stock Items - Company {company}"))
        .section("Zero Stock Alert")
        .metric("Items Out of Stock", rows.len().to_string());

    for row in rows {
        report = report
            .line(format!(
                "**Product {}** (Warehouse {}):",
                row.label("product_id", "?"),
                row.label("warehouse_id", "?")
            ))
            .line("   Status: COMPLETELY OUT OF STOCK")
            .line(format!("   Minimum Required: {}", format::units(row.number("min_qty_alert"))))
            .line(format!("   Reorder Point: {}", format::units(row.number("reorder_qty_alert"))));
    }

    Ok(report.build(Operation::OutOfStockItems, company))
}

pub async fn by_product<C: Connector>(
    db: &mut ConnectionManager<C>,
    company: CompanyId,
) -> Result<Answer> {
    let result = db.execute(BY_PRODUCT_SQL, &[company.param()]).await?;
    let rows = listing_rows(&result, || {
        format!("No product inventory data found for company {company}")
    })?;

    let mut report =
        ReportBuilder::new(format!("Product Inventory Distribution - Company {company}"))
            .section("Stock by Product")
            .metric("Products Listed", rows.len().to_string());

    for row in rows {
        report = report
            .line(format!("**Product {}**:", row.label("product_id", "?")))
            .line(format!("   Total Quantity: {}", format::units(row.number("total_quantity"))))
            .line(format!(
                "   Warehouses: {} locations",
                format::thousands(row.count("warehouse_count"))
            ))
            .line(format!(
                "   Average per Location: {}",
                format::units(row.number("avg_quantity"))
            ));
    }

    Ok(report.build(Operation::ProductInventory, company))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DatabaseType;
    use serde_json::json;

    #[test]
    fn test_at_or_below_minimum() {
        let mut row = Row::new();
        row.insert("quantity".to_string(), json!(5));
        row.insert("min_qty_alert".to_string(), json!("5.00"));
        assert!(is_at_or_below_minimum(&row));

        row.insert("quantity".to_string(), json!(6));
        assert!(!is_at_or_below_minimum(&row));

        row.insert("min_qty_alert".to_string(), json!(null));
        assert!(!is_at_or_below_minimum(&row));
    }

    #[test]
    fn test_queries_pass_guard() {
        for sql in [SUMMARY_SQL, RISK_SQL, LOW_STOCK_SQL, OUT_OF_STOCK_SQL, BY_PRODUCT_SQL] {
            for engine in [DatabaseType::MySQL, DatabaseType::SQLite] {
                assert!(crate::guard::check(sql, engine).is_ok());
            }
            assert_eq!(sql.matches('?').count(), 1);
        }
    }
}
