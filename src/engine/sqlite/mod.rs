//! `SQLite` Database Engine Implementation
//!
//! # Implementation Notes
//! - Uses `rusqlite` (synchronous driver, no await points while a statement is live)
//! - Files are opened read-only; a missing file is a connection error
//! - BLOB data is Base64-encoded for JSON safety
//! - Read timeout maps onto the busy timeout

use rusqlite::types::{ToSqlOutput, Value as SqliteValue};
use rusqlite::{Connection, OpenFlags, Row, ToSql};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::engine::{ConnectionConfig, Connector, DatabaseType, QueryResult, Session, SqlParam};
use crate::error::{AppError, Result};

/// Opens read-only `SQLite` sessions on a database file
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteConnector {
    /// Build a connector, rejecting incomplete configuration up front
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        if config.engine != DatabaseType::SQLite {
            return Err(AppError::configuration(format!(
                "Expected SQLite engine, got {}",
                config.engine
            )));
        }

        let path = config
            .file
            .clone()
            .ok_or_else(|| AppError::configuration("SQLite requires 'file' parameter"))?;

        Ok(Self {
            path,
            busy_timeout: Duration::from_secs(config.read_timeout_secs),
        })
    }
}

impl Connector for SqliteConnector {
    type Session = SqliteSession;

    fn engine(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    async fn connect(&self) -> Result<SqliteSession> {
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| AppError::connection(format!("Failed to open SQLite database: {e}")))?;

        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| AppError::connection(format!("Failed to set timeout: {e}")))?;

        Ok(SqliteSession { conn })
    }
}

/// One open `SQLite` connection
pub struct SqliteSession {
    conn: Connection,
}

impl Session for SqliteSession {
    async fn ping(&mut self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| AppError::connection(format!("Ping failed: {e}")))
    }

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<QueryResult> {
        execute_query(&self.conn, sql, params)
    }

    async fn close(self) {
        if let Err((_, e)) = self.conn.close() {
            debug!(error = %e, "error while closing SQLite connection");
        }
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Int(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            Self::Float(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            Self::Text(s) => ToSqlOutput::from(s.as_str()),
            Self::Null => ToSqlOutput::Owned(SqliteValue::Null),
        })
    }
}

/// Prepare, bind and collect a read query
fn execute_query(conn: &Connection, sql: &str, params: &[SqlParam]) -> Result<QueryResult> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| AppError::query_failed(format!("Failed to prepare query: {e}")))?;

    let column_names: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();

    let rows = stmt
        .query(rusqlite::params_from_iter(params.iter()))
        .map_err(|e| AppError::query_failed(format!("Failed to execute query: {e}")))?;

    let rows = rows
        .mapped(|row| row_to_json(&column_names, row))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AppError::query_failed(format!("Failed to fetch row: {e}")))?;

    Ok(QueryResult {
        columns: column_names,
        rows,
    })
}

/// Convert a `SQLite` row to a JSON-safe `HashMap`
fn row_to_json(
    column_names: &[String],
    row: &Row,
) -> std::result::Result<HashMap<String, serde_json::Value>, rusqlite::Error> {
    let mut map = HashMap::with_capacity(column_names.len());

    for (idx, name) in column_names.iter().enumerate() {
        map.insert(name.clone(), sqlite_value_to_json(row, idx)?);
    }

    Ok(map)
}

/// Convert `SQLite` value to JSON value
fn sqlite_value_to_json(
    row: &Row,
    idx: usize,
) -> std::result::Result<serde_json::Value, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    Ok(match row.get_ref(idx)? {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        ValueRef::Text(s) => {
            let text = std::str::from_utf8(s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            serde_json::Value::String(text.to_string())
        }
        ValueRef::Blob(b) => {
            use base64::Engine;
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
    })
}
