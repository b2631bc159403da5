//! Configuration Management
//!
//! Loads database, retry and LLM settings for the assistant.
//!
//! # Configuration Locations
//! - Local: `.erpchat/config.json` (per-project)
//! - Global: `~/.config/erpchat/config.json` (per-user)
//!
//! # Resolution Precedence
//! 1. Environment variables (a `.env` file in the working directory is loaded first)
//! 2. Local config file (`.erpchat/config.json`)
//! 3. Global config file (`~/.config/erpchat/config.json`)
//!
//! Only the first config file found is read; environment variables are then
//! applied on top of it field by field.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::connection::RetryPolicy;
use crate::engine::{ConnectionConfig, DatabaseType};
use crate::error::{AppError, Result};
use crate::llm::LlmConfig;

const DEFAULT_MYSQL_PORT: u16 = 3306;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Database section of the config file
///
/// Every field is optional here so that environment variables can fill the
/// gaps; [`DatabaseSection::resolve`] checks that the result is complete.
#[derive(Default, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<DatabaseType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name for password (if not storing password directly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for DatabaseSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSection")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("password_env", &self.password_env)
            .field("database", &self.database)
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

impl DatabaseSection {
    /// Engine in effect: explicit, else `SQLite` when only a file is given, else `MySQL`
    #[must_use]
    pub fn effective_engine(&self) -> DatabaseType {
        match (self.engine, &self.file, &self.host) {
            (Some(engine), _, _) => engine,
            (None, Some(_), None) => DatabaseType::SQLite,
            _ => DatabaseType::MySQL,
        }
    }

    /// Build a validated [`ConnectionConfig`]
    ///
    /// `lookup` resolves `password_env`; it is `std::env::var` outside tests.
    pub fn resolve(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<ConnectionConfig> {
        let engine = self.effective_engine();

        let password = match (&self.password, &self.password_env) {
            (Some(password), _) => Some(password.clone()),
            (None, Some(env_var)) => Some(lookup(env_var).ok_or_else(|| {
                AppError::configuration(format!(
                    "Environment variable {env_var} not found for password"
                ))
            })?),
            (None, None) => None,
        };

        let config = ConnectionConfig {
            engine,
            host: self.host.clone(),
            port: match engine {
                DatabaseType::MySQL => Some(self.port.unwrap_or(DEFAULT_MYSQL_PORT)),
                DatabaseType::SQLite => None,
            },
            user: self.user.clone(),
            password,
            database: self.database.clone(),
            file: self.file.clone(),
            connect_timeout_secs: self.connect_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            read_timeout_secs: self.read_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Retry section of the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_ping_attempts")]
    pub ping_attempts: u32,

    #[serde(default = "default_ping_backoff_secs")]
    pub ping_backoff_secs: u64,

    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
}

const fn default_ping_attempts() -> u32 {
    3
}

const fn default_ping_backoff_secs() -> u64 {
    5
}

const fn default_connect_attempts() -> u32 {
    2
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            ping_attempts: default_ping_attempts(),
            ping_backoff_secs: default_ping_backoff_secs(),
            connect_attempts: default_connect_attempts(),
        }
    }
}

impl RetrySettings {
    /// Policy for the connection manager; zero attempts are raised to one
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            ping_attempts: self.ping_attempts.max(1),
            ping_backoff: Duration::from_secs(self.ping_backoff_secs),
            connect_attempts: self.connect_attempts.max(1),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub llm: LlmConfig,

    /// `tracing` filter directive, e.g. `info` or `erpchat=debug`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Load `.env`, the first config file found, then environment overrides
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env file");
        }

        let mut config = match first_existing(&[local_config_path()?, global_config_path()?]) {
            Some(path) => {
                debug!(path = %path.display(), "reading config file");
                load_file(&path)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay environment variables read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db = &mut self.database;
        if let Some(engine) = value("DB_ENGINE") {
            db.engine = Some(engine.parse()?);
        }
        if let Some(host) = value("DB_HOST") {
            db.host = Some(host);
        }
        if let Some(port) = value("DB_PORT") {
            db.port = Some(port.parse().map_err(|_| {
                AppError::configuration(format!("DB_PORT must be a port number, got '{port}'"))
            })?);
        }
        if let Some(database) = value("DB_NAME") {
            db.database = Some(database);
        }
        if let Some(user) = value("DB_USER") {
            db.user = Some(user);
        }
        if let Some(password) = lookup("DB_PASSWORD").filter(|v| !v.is_empty()) {
            db.password = Some(password);
        }
        if let Some(file) = value("DB_FILE") {
            db.file = Some(PathBuf::from(file));
        }

        if let Some(api_key) = value("OPENROUTER_API_KEY") {
            self.llm.api_key = Some(api_key);
        }
        if let Some(base_url) = value("OPENROUTER_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(model) = value("OPENROUTER_MODEL") {
            self.llm.model = model;
        }
        if let Some(level) = value("ERPCHAT_LOG") {
            self.log_level = Some(level);
        }

        Ok(())
    }

    /// Validated connection settings, resolving `password_env` from the process environment
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        self.database.resolve(|key| std::env::var(key).ok())
    }
}

/// Get path to local config file (`.erpchat/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        AppError::configuration(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".erpchat").join("config.json"))
}

/// Get path to global config file (`~/.config/erpchat/config.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::configuration("Could not determine user config directory"))?;

    Ok(config_dir.join("erpchat").join("config.json"))
}

fn first_existing(paths: &[PathBuf]) -> Option<PathBuf> {
    paths.iter().find(|p| p.exists()).cloned()
}

/// Read one config file; a missing file yields the defaults
pub fn load_file(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| AppError::configuration(format!("Could not read config file: {e}")))?;

    serde_json::from_str(&contents).map_err(|e| {
        AppError::configuration(format!("Invalid config file {}: {e}", path.display()))
    })
}
