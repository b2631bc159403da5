//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout erpchat.
//! All errors are structured and map to stable error codes for JSON output.
//!
//! # Error Categories
//! - `Configuration`: Missing or invalid connection settings (fatal at startup)
//! - `Connection`: Transport failures talking to the database
//! - `SecurityViolation`: Query rejected by the write-statement guard
//! - `Validation`: Malformed input (company identifier, empty query)
//! - `NoData`: Query returned nothing for the company (informational)
//! - `QueryFailed`: The driver reported an error while running a query
//! - `Llm`: The optional LLM collaborator failed

use thiserror::Error;

/// Main error type for erpchat operations
#[derive(Error, Debug)]
pub enum AppError {
    /// Required configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database connection failed or was lost
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Query rejected before execution because it would mutate data
    #[error("Security violation: write operation '{verb}' detected. Read-only mode.")]
    SecurityViolation { verb: String },

    /// Invalid input (bad company identifier, empty query)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Nothing to report for the company
    #[error("{0}")]
    NoData(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// LLM collaborator error
    #[error("LLM error: {0}")]
    Llm(String),
}

impl AppError {
    /// Convert error to error code string for JSON output
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::SecurityViolation { .. } => "SECURITY_VIOLATION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NoData(_) => "NO_DATA",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::Llm(_) => "LLM_ERROR",
        }
    }

    /// Human-readable message, safe to show to the user.
    ///
    /// Never contains credentials.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether the handle that produced this error must be discarded
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::QueryFailed(_))
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a security violation naming the offending verb
    pub fn security_violation(verb: impl Into<String>) -> Self {
        Self::SecurityViolation { verb: verb.into() }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a no-data error
    pub fn no_data(message: impl Into<String>) -> Self {
        Self::NoData(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create an LLM collaborator error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }
}

/// Result type alias for erpchat operations
pub type Result<T> = std::result::Result<T, AppError>;
