//! Connection, Discovery and Export Tests
//!
//! Exercises the connection manager, the companies list, schema discovery and
//! the CSV report against a `SQLite` ERP fixture.

#![cfg(feature = "sqlite")]

mod common;

use pretty_assertions::assert_eq;

use common::{assistant, create_erp_db, manager, VOUCHER_ONLY_COMPANY};
use erpchat::company::{list_companies, VERIFIED_COMPANIES};
use erpchat::{report, schema, CompanyId};

// ============================================================================
// Connection manager
// ============================================================================

#[tokio::test]
async fn test_connection_check_query() {
    let mut db = manager(create_erp_db());

    let result = db.execute("SELECT 1 AS test", &[]).await.unwrap();

    assert_eq!(result.columns, vec!["test".to_string()]);
    assert_eq!(result.rows[0]["test"], 1);
    assert!(db.is_connected());
}

#[tokio::test]
async fn test_write_rejected_before_connecting() {
    let mut db = manager(create_erp_db());

    for sql in [
        "DELETE FROM stock",
        "  update stock SET quantity = 0",
        "SELECT 1; DROP TABLE stock",
    ] {
        let err = db.execute(sql, &[]).await.unwrap_err();
        assert_eq!(err.error_code(), "SECURITY_VIOLATION", "{sql}");
    }
    assert!(!db.is_connected());
}

#[tokio::test]
async fn test_literal_verbs_pass_guard() {
    let mut db = manager(create_erp_db());

    let result = db
        .execute("SELECT COUNT(*) AS n FROM sales_invoice WHERE status = 'update'", &[])
        .await
        .unwrap();

    assert_eq!(result.rows[0]["n"], 0);
}

#[tokio::test]
async fn test_failed_query_replaces_handle() {
    let mut db = manager(create_erp_db());

    let err = db.execute("SELECT * FROM no_such_table", &[]).await.unwrap_err();
    assert_eq!(err.error_code(), "QUERY_FAILED");
    assert!(!db.is_connected());

    let result = db.execute("SELECT 1 AS test", &[]).await.unwrap();
    assert_eq!(result.rows.len(), 1);
    assert!(db.is_connected());
}

#[tokio::test]
async fn test_positional_company_parameter() {
    let mut db = manager(create_erp_db());
    let company = CompanyId::new(922).unwrap();

    let result = db
        .execute("SELECT COUNT(*) AS n FROM stock WHERE company_id = ?", &[company.param()])
        .await
        .unwrap();

    assert_eq!(result.rows[0]["n"], 4);
}

// ============================================================================
// Companies and schema
// ============================================================================

#[tokio::test]
async fn test_companies_verified_first_then_discovered() {
    let mut db = manager(create_erp_db());

    let companies: Vec<i64> =
        list_companies(&mut db).await.into_iter().map(CompanyId::get).collect();

    let mut expected = VERIFIED_COMPANIES.to_vec();
    expected.push(VOUCHER_ONLY_COMPANY);
    assert_eq!(companies, expected);
}

#[tokio::test]
async fn test_companies_fall_back_to_verified_list() {
    let mut db = manager(std::env::temp_dir().join("erpchat_missing_dir/none.db"));

    let companies: Vec<i64> =
        list_companies(&mut db).await.into_iter().map(CompanyId::get).collect();

    assert_eq!(companies, VERIFIED_COMPANIES.to_vec());
}

#[tokio::test]
async fn test_company_scoped_tables() {
    let mut db = manager(create_erp_db());

    let tables = schema::company_tables(&mut db).await.unwrap();

    assert_eq!(tables, vec!["sales_items", "stock", "voucher_items"]);
}

#[tokio::test]
async fn test_describe_table() {
    let mut db = manager(create_erp_db());

    let columns = schema::describe_table(&mut db, "stock").await.unwrap();

    assert_eq!(columns.len(), 9);
    assert_eq!(columns[0].name, "stock_id");
    assert!(columns[0].primary_key);
    let company = columns.iter().find(|c| c.name == "company_id").unwrap();
    assert_eq!(company.data_type, "integer");
    assert!(!company.nullable);

    let missing = schema::describe_table(&mut db, "no_such_table").await.unwrap();
    assert!(missing.is_empty());
}

// ============================================================================
// CSV report
// ============================================================================

#[tokio::test]
async fn test_report_csv_sections() {
    let mut assistant = assistant(create_erp_db());

    let csv = report::generate(&mut assistant, CompanyId::new(922).unwrap()).await;

    assert!(csv.starts_with("ERP Report - Company 922\nGenerated: "));
    assert!(csv.contains("SALES METRICS\nMetric,Value\nTotal Invoices,10\nTotal Revenue,500.00\n"));
    assert!(csv.contains(
        "CASH FLOW METRICS\nMetric,Value\nTotal Transactions,3\nTotal Cash Inflows,1000.00\n"
    ));
    assert!(csv.contains("INVENTORY METRICS\nMetric,Value\nTotal Products,3\n"));
}

#[tokio::test]
async fn test_report_for_empty_company_keeps_headers() {
    let mut assistant = assistant(create_erp_db());

    let csv = report::generate(&mut assistant, CompanyId::new(1336).unwrap()).await;

    assert!(csv.contains(
        "SALES METRICS\nMetric,Value\nNote,No sales data found for company 1336\n"
    ));
    assert!(csv.contains(
        "INVENTORY METRICS\nMetric,Value\nNote,No inventory data found for company 1336\n"
    ));
}
