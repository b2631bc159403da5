//! Shared `SQLite` ERP fixture for integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use erpchat::engine::sqlite::SqliteConnector;
use erpchat::{Assistant, ConnectionConfig, ConnectionManager, RetryPolicy};

/// Company with a full data set in the fixture
pub const ACTIVE_COMPANY: &str = "922";
/// Verified company with no rows at all
pub const EMPTY_COMPANY: &str = "1336";
/// Company that only appears in voucher lines
pub const VOUCHER_ONLY_COMPANY: i64 = 2001;

const SCHEMA: &str = "
    CREATE TABLE sales_invoice (
        invoice_id   INTEGER PRIMARY KEY,
        customer_id  INTEGER,
        invoice_date TEXT,
        status       TEXT
    );
    CREATE TABLE sales_items (
        id         INTEGER PRIMARY KEY,
        invoice_id INTEGER,
        company_id INTEGER,
        product_id INTEGER,
        quantity   REAL,
        price      REAL,
        total      REAL
    );
    CREATE TABLE contacts (
        contact_id INTEGER PRIMARY KEY,
        region     INTEGER
    );
    CREATE TABLE origins (
        id    INTEGER PRIMARY KEY,
        title TEXT
    );
    CREATE TABLE products (
        product_id        INTEGER PRIMARY KEY,
        min_qty_alert     REAL,
        reorder_qty_alert REAL
    );
    CREATE TABLE stock (
        stock_id     INTEGER PRIMARY KEY,
        company_id   INTEGER NOT NULL,
        product_id   INTEGER,
        warehouse_id INTEGER,
        quantity     REAL,
        stock_type   TEXT,
        cost         REAL,
        overhead     REAL,
        stock_date   TEXT
    );
    CREATE TABLE voucher_items (
        id         INTEGER PRIMARY KEY,
        voucher_id INTEGER,
        company_id INTEGER,
        credit     REAL,
        debit      REAL
    );";

/// Build a fresh fixture database and return its path
///
/// Company 922 has ten paid invoices of 50.00 each (one line, two units per
/// invoice, five customers over two regions), one cancelled invoice that must
/// be ignored, three purchase stock entries (one empty, one below minimum, one
/// healthy) and three voucher lines (1,000.00 in, 400.00 out).
pub fn create_erp_db() -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!("erpchat_fixture_{}_{id}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let conn = rusqlite::Connection::open(&path).expect("Failed to create fixture database");
    conn.execute_batch(SCHEMA).expect("Failed to create schema");

    conn.execute_batch(
        "INSERT INTO origins (id, title) VALUES (1, 'North'), (2, 'South');
         INSERT INTO contacts (contact_id, region) VALUES (1, 1), (2, 1), (3, 2), (4, 2), (5, 2);
         INSERT INTO products (product_id, min_qty_alert, reorder_qty_alert)
             VALUES (1, 5, 20), (2, 5, 20), (3, 10, 40);",
    )
    .expect("Failed to insert reference data");

    for invoice in 1..=10_i64 {
        conn.execute(
            "INSERT INTO sales_invoice (invoice_id, customer_id, invoice_date, status)
             VALUES (?1, ?2, ?3, 'paid')",
            rusqlite::params![invoice, (invoice - 1) % 5 + 1, format!("2024-01-{invoice:02}")],
        )
        .expect("Failed to insert invoice");
        conn.execute(
            "INSERT INTO sales_items (invoice_id, company_id, product_id, quantity, price, total)
             VALUES (?1, 922, ?2, 2, 25.0, 50.0)",
            rusqlite::params![invoice, (invoice - 1) % 3 + 1],
        )
        .expect("Failed to insert invoice line");
    }

    conn.execute_batch(
        "INSERT INTO sales_invoice (invoice_id, customer_id, invoice_date, status)
             VALUES (11, 1, '2024-02-01', 'cancelled');
         INSERT INTO sales_items (invoice_id, company_id, product_id, quantity, price, total)
             VALUES (11, 922, 1, 40, 25.0, 1000.0);

         INSERT INTO stock
         (company_id, product_id, warehouse_id, quantity, stock_type, cost, overhead, stock_date)
             VALUES (922, 1, 1, 0,   'purchase', 100.0, 10.0, '2024-03-01'),
                    (922, 2, 1, 3,   'purchase', 200.0, 0.0,  '2024-03-05'),
                    (922, 3, 2, 100, 'purchase', 300.0, 20.0, '2024-02-20'),
                    (922, 3, 2, 7,   'sale',     0.0,   0.0,  '2024-03-09');

         INSERT INTO voucher_items (voucher_id, company_id, credit, debit)
             VALUES (1, 922, 1000.0, 0.0),
                    (1, 922, 0.0, 150.0),
                    (2, 922, NULL, 250.0),
                    (3, 2001, 10.0, 0.0);",
    )
    .expect("Failed to insert fixture data");

    path
}

/// Retry policy without pauses so failure paths stay fast
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        ping_attempts: 1,
        ping_backoff: Duration::ZERO,
        connect_attempts: 2,
    }
}

pub fn manager(path: PathBuf) -> ConnectionManager<SqliteConnector> {
    let connector = SqliteConnector::new(&ConnectionConfig::sqlite(path)).expect("valid config");
    ConnectionManager::with_policy(connector, fast_policy())
}

pub fn assistant(path: PathBuf) -> Assistant<SqliteConnector> {
    Assistant::new(manager(path))
}
