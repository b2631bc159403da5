//! Schema discovery
//!
//! Lists the tenant-scoped tables (those with a `company_id` column) and
//! describes a table's columns. Catalog queries differ per engine; the output
//! shape does not.

use serde::Serialize;

use crate::connection::ConnectionManager;
use crate::engine::{Connector, DatabaseType, SqlParam};
use crate::error::Result;
use crate::operations::RowExt;

const MYSQL_COMPANY_TABLES_SQL: &str = "
    SELECT DISTINCT TABLE_NAME AS table_name
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE COLUMN_NAME = 'company_id'
      AND TABLE_SCHEMA = DATABASE()
    ORDER BY TABLE_NAME";

const SQLITE_COMPANY_TABLES_SQL: &str = "
    SELECT m.name AS table_name
    FROM sqlite_master m
             JOIN pragma_table_info(m.name) p
    WHERE m.type = 'table'
      AND p.name = 'company_id'
    ORDER BY m.name";

const MYSQL_DESCRIBE_SQL: &str = "
    SELECT COLUMN_NAME AS column_name,
           DATA_TYPE   AS data_type,
           IS_NULLABLE AS is_nullable,
           COLUMN_KEY  AS column_key
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_NAME = ?
      AND TABLE_SCHEMA = DATABASE()
    ORDER BY ORDINAL_POSITION";

const SQLITE_DESCRIBE_SQL: &str = "
    SELECT name AS column_name,
           type AS data_type,
           CASE WHEN \"notnull\" = 1 THEN 'NO' ELSE 'YES' END AS is_nullable,
           CASE WHEN pk > 0 THEN 'PRI' ELSE '' END AS column_key
    FROM pragma_table_info(?)
    ORDER BY cid";

/// Column description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

/// Names of tables carrying a `company_id` column, sorted
pub async fn company_tables<C: Connector>(db: &mut ConnectionManager<C>) -> Result<Vec<String>> {
    let sql = match db.engine() {
        DatabaseType::MySQL => MYSQL_COMPANY_TABLES_SQL,
        DatabaseType::SQLite => SQLITE_COMPANY_TABLES_SQL,
    };

    let result = db.execute(sql, &[]).await?;
    Ok(result
        .rows
        .iter()
        .map(|row| row.label("table_name", ""))
        .filter(|n| !n.is_empty())
        .collect())
}

/// Columns of `table` in declaration order; empty when the table does not exist
pub async fn describe_table<C: Connector>(
    db: &mut ConnectionManager<C>,
    table: &str,
) -> Result<Vec<ColumnInfo>> {
    let sql = match db.engine() {
        DatabaseType::MySQL => MYSQL_DESCRIBE_SQL,
        DatabaseType::SQLite => SQLITE_DESCRIBE_SQL,
    };

    let result = db.execute(sql, &[SqlParam::from(table)]).await?;
    Ok(result
        .rows
        .iter()
        .map(|row| ColumnInfo {
            name: row.label("column_name", ""),
            data_type: row.label("data_type", "").to_lowercase(),
            nullable: row.label("is_nullable", "YES").eq_ignore_ascii_case("YES"),
            primary_key: row.label("column_key", "") == "PRI",
        })
        .collect())
}
