//! Write Guard Performance Benchmarks
//!
//! The guard runs before every statement, so its cost is paid per query:
//! - Short aggregate queries
//! - Long multi-join report queries
//! - Literal- and comment-heavy text
//! - Rejections
//!
//! `MySQL` pays for two passes, one per `sql_mode` reading of backslashes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use erpchat::{guard, DatabaseType};

const ENGINES: [(&str, DatabaseType); 2] =
    [("mysql", DatabaseType::MySQL), ("sqlite", DatabaseType::SQLite)];

const SHORT: &str = "SELECT COUNT(*) AS n FROM stock WHERE company_id = ?";

const REPORT: &str = "
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

const LITERALS: &str = "SELECT 'delete; drop' AS a, \"update\" AS b -- insert into x
    /* truncate; alter */ FROM t WHERE note = 'it''s; create'";

fn bench_accept(c: &mut Criterion) {
    for (label, engine) in ENGINES {
        c.bench_function(&format!("guard_short_select_{label}"), |b| {
            b.iter(|| guard::check(black_box(SHORT), engine));
        });
        c.bench_function(&format!("guard_report_select_{label}"), |b| {
            b.iter(|| guard::check(black_box(REPORT), engine));
        });
        c.bench_function(&format!("guard_literals_and_comments_{label}"), |b| {
            b.iter(|| guard::check(black_box(LITERALS), engine));
        });
    }
}

fn bench_reject(c: &mut Criterion) {
    c.bench_function("guard_reject_leading_delete", |b| {
        b.iter(|| {
            guard::check(black_box("DELETE FROM stock WHERE company_id = 922"), DatabaseType::MySQL)
        });
    });
    c.bench_function("guard_reject_stacked_drop", |b| {
        b.iter(|| guard::check(black_box("SELECT 1; DROP TABLE stock"), DatabaseType::MySQL));
    });
}

criterion_group!(benches, bench_accept, bench_reject);
criterion_main!(benches);
