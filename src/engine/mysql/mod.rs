//! MySQL Database Engine Implementation
//!
//! # Implementation Notes
//! - Uses `mysql_async` (async driver, requires tokio runtime)
//! - Parameters are bound as positional values, never spliced into SQL text
//! - DECIMAL columns arrive as text; callers parse them as numbers
//! - BLOB data is Base64-encoded for JSON safety
//! - Connect and query timeouts enforced via `tokio::time::timeout`

use mysql_async::{prelude::*, Conn, OptsBuilder, Params, Row, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::engine::{ConnectionConfig, Connector, DatabaseType, QueryResult, Session, SqlParam};
use crate::error::{AppError, Result};

/// Opens `MySQL` sessions from a validated [`ConnectionConfig`]
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    config: ConnectionConfig,
}

impl MySqlConnector {
    /// Build a connector, rejecting incomplete configuration up front
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        if config.engine != DatabaseType::MySQL {
            return Err(AppError::configuration(format!(
                "Expected MySQL engine, got {}",
                config.engine
            )));
        }
        config.validate()?;
        Ok(Self { config })
    }
}

impl Connector for MySqlConnector {
    type Session = MySqlSession;

    fn engine(&self) -> DatabaseType {
        DatabaseType::MySQL
    }

    async fn connect(&self) -> Result<MySqlSession> {
        let opts = build_mysql_opts(&self.config)?;
        let connect_timeout = Duration::from_secs(self.config.connect_timeout_secs);

        let conn = tokio::time::timeout(connect_timeout, Conn::new(opts))
            .await
            .map_err(|_| {
                AppError::connection(format!(
                    "Connection attempt exceeded timeout of {}s",
                    self.config.connect_timeout_secs
                ))
            })?
            .map_err(|e| AppError::connection(format!("Failed to connect to MySQL: {e}")))?;

        Ok(MySqlSession {
            conn,
            read_timeout: Duration::from_secs(self.config.read_timeout_secs),
        })
    }
}

/// One live `MySQL` connection
pub struct MySqlSession {
    conn: Conn,
    read_timeout: Duration,
}

impl Session for MySqlSession {
    async fn ping(&mut self) -> Result<()> {
        tokio::time::timeout(self.read_timeout, self.conn.ping())
            .await
            .map_err(|_| AppError::connection("Ping exceeded read timeout"))?
            .map_err(|e| AppError::connection(format!("Ping failed: {e}")))
    }

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<QueryResult> {
        let params = if params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(params.iter().map(Value::from).collect())
        };

        let rows = tokio::time::timeout(self.read_timeout, self.conn.exec::<Row, _, _>(sql, params))
            .await
            .map_err(|_| {
                AppError::query_failed(format!(
                    "Query exceeded timeout of {}s",
                    self.read_timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::query_failed(format!("Failed to execute query: {e}")))?;

        // Column names come from the first row; an empty result carries none
        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns_ref().iter().map(|col| col.name_str().to_string()).collect())
            .unwrap_or_default();

        let rows = rows.iter().map(row_to_json).collect::<Result<Vec<_>>>()?;

        Ok(QueryResult { columns, rows })
    }

    async fn close(self) {
        if let Err(e) = self.conn.disconnect().await {
            debug!(error = %e, "error while closing MySQL connection");
        }
    }
}

impl From<&SqlParam> for Value {
    fn from(param: &SqlParam) -> Self {
        match param {
            SqlParam::Int(i) => Self::Int(*i),
            SqlParam::Float(f) => Self::Double(*f),
            SqlParam::Text(s) => Self::Bytes(s.clone().into_bytes()),
            SqlParam::Null => Self::NULL,
        }
    }
}

/// Build MySQL connection options from `ConnectionConfig`
fn build_mysql_opts(config: &ConnectionConfig) -> Result<OptsBuilder> {
    let host = config
        .host
        .as_ref()
        .ok_or_else(|| AppError::configuration("MySQL requires 'host' parameter"))?;

    let user = config
        .user
        .as_ref()
        .ok_or_else(|| AppError::configuration("MySQL requires 'user' parameter"))?;

    let password = config
        .password
        .as_ref()
        .ok_or_else(|| AppError::configuration("MySQL requires 'password' parameter"))?;

    let database = config
        .database
        .as_ref()
        .ok_or_else(|| AppError::configuration("MySQL requires 'database' parameter"))?;

    let opts = OptsBuilder::default()
        .ip_or_hostname(host)
        .tcp_port(config.port.unwrap_or(3306))
        .user(Some(user))
        .pass(Some(password))
        .db_name(Some(database));

    Ok(opts)
}

/// Convert a MySQL row to a JSON-safe `HashMap`
fn row_to_json(row: &Row) -> Result<HashMap<String, serde_json::Value>> {
    let mut map = HashMap::new();

    for (idx, column) in row.columns_ref().iter().enumerate() {
        let value = row.as_ref(idx).ok_or_else(|| {
            AppError::query_failed(format!("Failed to get value at index {idx}"))
        })?;
        map.insert(column.name_str().to_string(), mysql_value_to_json(value));
    }

    Ok(map)
}

/// Convert MySQL value to JSON value
fn mysql_value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::NULL => serde_json::Value::Null,

        Value::Bytes(bytes) => {
            if let Ok(s) = std::str::from_utf8(bytes) {
                serde_json::Value::String(s.to_string())
            } else {
                use base64::Engine;
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }

        Value::Int(i) => serde_json::Value::Number((*i).into()),

        Value::UInt(u) => serde_json::json!(*u),

        Value::Float(f) => serde_json::Number::from_f64(f64::from(*f))
            .map_or(serde_json::Value::Null, serde_json::Value::Number),

        Value::Double(d) => serde_json::Number::from_f64(*d)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),

        Value::Date(year, month, day, hour, minute, second, micro) => {
            // Pure dates keep the YYYY-MM-DD shape the formatter expects
            let text = if (*hour, *minute, *second, *micro) == (0, 0, 0, 0) {
                format!("{year:04}-{month:02}-{day:02}")
            } else {
                format!(
                    "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{micro:06}"
                )
            };
            serde_json::Value::String(text)
        }

        Value::Time(is_negative, days, hours, minutes, seconds, microseconds) => {
            let sign = if *is_negative { "-" } else { "" };
            let total_hours = days * 24 + u32::from(*hours);
            serde_json::Value::String(format!(
                "{sign}{total_hours}:{minutes:02}:{seconds:02}.{microseconds:06}"
            ))
        }
    }
}
