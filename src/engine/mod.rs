//! Database Engine Traits and Core Types
//!
//! A [`Connector`] knows how to open a [`Session`] from static configuration. A
//! session is one live handle to the store: it can be pinged, queried and closed.
//! The connection manager owns at most one session at a time and decides when to
//! ping, reuse or replace it.
//!
//! # Engine Isolation
//! Each engine implementation is independent. Both accept `?` positional
//! placeholders, so the operation templates are shared.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Supported database engine types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `MySQL` database (includes `MariaDB`)
    MySQL,
    /// `SQLite` database
    SQLite,
}

impl DatabaseType {
    /// Get the engine name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DatabaseType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySQL),
            "sqlite" => Ok(Self::SQLite),
            other => Err(AppError::configuration(format!("Unknown database engine '{other}'"))),
        }
    }
}

/// Connection settings for a database engine
///
/// Fields are engine-specific (`file` only applies to `SQLite`).
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database engine type
    pub engine: DatabaseType,

    /// Hostname (mysql)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port number (mysql)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Username (mysql)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Password (mysql)
    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Database name (mysql)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Database file path (sqlite)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Seconds allowed for establishing a connection
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Seconds allowed for a single query round trip
    #[serde(default = "default_timeout_secs")]
    pub read_timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    30
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .field("file", &self.file)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .finish()
    }
}

impl ConnectionConfig {
    /// Create a new `MySQL` connection config
    #[must_use]
    pub const fn mysql(
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    ) -> Self {
        Self {
            engine: DatabaseType::MySQL,
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            database: Some(database),
            file: None,
            connect_timeout_secs: default_timeout_secs(),
            read_timeout_secs: default_timeout_secs(),
        }
    }

    /// Create a new `SQLite` connection config
    #[must_use]
    pub const fn sqlite(file: PathBuf) -> Self {
        Self {
            engine: DatabaseType::SQLite,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            file: Some(file),
            connect_timeout_secs: default_timeout_secs(),
            read_timeout_secs: default_timeout_secs(),
        }
    }

    /// Check that every field the engine needs is present.
    ///
    /// Called before the first connection attempt so that a bad configuration
    /// fails loudly instead of looking like a transient outage.
    pub fn validate(&self) -> Result<()> {
        match self.engine {
            DatabaseType::MySQL => {
                let missing: Vec<&str> = [
                    ("host", self.host.is_none()),
                    ("database", self.database.is_none()),
                    ("user", self.user.is_none()),
                    ("password", self.password.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();

                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(AppError::configuration(format!(
                        "Missing required database configuration: {}",
                        missing.join(", ")
                    )))
                }
            }
            DatabaseType::SQLite => {
                if self.file.is_some() {
                    Ok(())
                } else {
                    Err(AppError::configuration("SQLite requires 'file' parameter"))
                }
            }
        }
    }
}

/// A positional query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One result row: column name to value
pub type Row = HashMap<String, serde_json::Value>;

/// Query execution result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in result order
    pub columns: Vec<String>,

    /// Result rows, in the order the database returned them
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// True when the query produced no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row, if any
    #[must_use]
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }
}

/// A single live handle to the store
pub trait Session: Send {
    /// Cheap round trip proving the handle still works
    fn ping(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Run a read query with positional parameters.
    ///
    /// Implementations bind `params` through the driver; they never splice them
    /// into `sql`.
    fn query(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> impl std::future::Future<Output = Result<QueryResult>> + Send;

    /// Close the handle. Errors are swallowed: the handle is being discarded anyway.
    fn close(self) -> impl std::future::Future<Output = ()> + Send;
}

/// Factory for sessions built from static configuration
pub trait Connector: Send + Sync {
    /// Session type produced by this connector
    type Session: Session;

    /// Engine label used in logs and output envelopes
    fn engine(&self) -> DatabaseType;

    /// Open a brand-new session
    fn connect(&self) -> impl std::future::Future<Output = Result<Self::Session>> + Send;
}
