//! erpchat - Natural-Language ERP Query Assistant
//!
//! Answers free-text business questions (sales, inventory, cash flow) from a
//! company-scoped ERP database. Every question is reduced to one of a fixed set
//! of read-only queries; answers are formatted text with the headline metrics
//! attached for machine consumers.
//!
//! # Core Principles
//! - Read-only: every statement passes the write guard before it reaches a driver
//! - Tenant isolation: every operation is scoped by a validated [`CompanyId`]
//! - Deterministic routing: keyword tables first, LLM only when enabled
//! - Failures become answers, never crashes
//!
//! # Module Organization
//! - [`error`] - Error types and codes
//! - [`guard`] - Write-statement guard
//! - [`engine`] - Connector/session traits and the `MySQL` and `SQLite` drivers
//! - [`connection`] - Single-handle connection manager
//! - [`router`] - Domain and operation dispatch
//! - [`operations`] - Sales, inventory and cash-flow queries
//! - [`format`] - Number formatting and the answer type
//! - [`assistant`] - Question answering boundary
//! - [`report`] - CSV export
//! - [`company`], [`schema`] - Company listing and schema discovery
//! - [`llm`] - Optional OpenAI-compatible collaborator
//! - [`config`], [`output`] - Configuration loading and JSON envelopes

pub mod assistant;
pub mod company;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod format;
pub mod guard;
pub mod llm;
pub mod operations;
pub mod output;
pub mod report;
pub mod router;
pub mod schema;

// Re-export commonly used types for convenience
pub use assistant::Assistant;
pub use company::CompanyId;
pub use config::AppConfig;
pub use connection::{ConnectionManager, RetryPolicy};
pub use engine::{ConnectionConfig, Connector, DatabaseType, QueryResult, Session, SqlParam};
pub use error::{AppError, Result};
pub use format::{Answer, AnswerKind};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
pub use router::{Domain, Operation};
