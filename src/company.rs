//! Tenant identifiers and the companies list

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::connection::ConnectionManager;
use crate::engine::{Connector, SqlParam};
use crate::error::{AppError, Result};

/// Companies known to carry a full data set, always listed first
pub const VERIFIED_COMPANIES: [i64; 4] = [922, 1336, 1387, 1415];

/// Longest companies list handed to a picker
pub const MAX_LISTED_COMPANIES: usize = 10;

const DISCOVER_COMPANIES_SQL: &str = "
    SELECT DISTINCT company_id
    FROM sales_items
    WHERE company_id IS NOT NULL
    UNION
    SELECT DISTINCT company_id
    FROM voucher_items
    WHERE company_id IS NOT NULL
    ORDER BY company_id LIMIT 10";

/// Positive integer scoping every query to one tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct CompanyId(i64);

impl CompanyId {
    /// Wrap a raw id, rejecting zero and negatives
    pub fn new(raw: i64) -> Result<Self> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(AppError::validation(format!(
                "Company ID must be a positive integer, got {raw}"
            )))
        }
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Bind value for the `company_id = ?` placeholder
    #[must_use]
    pub const fn param(self) -> SqlParam {
        SqlParam::Int(self.0)
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CompanyId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("Company ID is required"));
        }

        let raw = trimmed.parse::<i64>().map_err(|_| {
            AppError::validation(format!("Company ID must be a positive integer, got '{trimmed}'"))
        })?;
        Self::new(raw)
    }
}

impl TryFrom<i64> for CompanyId {
    type Error = AppError;

    fn try_from(raw: i64) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<CompanyId> for i64 {
    fn from(id: CompanyId) -> Self {
        id.0
    }
}

fn verified() -> Vec<CompanyId> {
    VERIFIED_COMPANIES.into_iter().map(CompanyId).collect()
}

/// Verified companies first, then discovered ones, capped at [`MAX_LISTED_COMPANIES`].
///
/// Discovery failures are logged and the verified list is returned on its own.
pub async fn list_companies<C: Connector>(db: &mut ConnectionManager<C>) -> Vec<CompanyId> {
    let discovered = match db.execute(DISCOVER_COMPANIES_SQL, &[]).await {
        Ok(result) => result
            .rows
            .iter()
            .filter_map(|row| row.get("company_id"))
            .filter_map(company_from_value)
            .collect(),
        Err(e) => {
            warn!(error = %e, "company discovery failed, using verified list");
            Vec::new()
        }
    };

    merge_companies(verified(), discovered)
}

fn company_from_value(value: &serde_json::Value) -> Option<CompanyId> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(|raw| CompanyId::new(raw).ok()),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn merge_companies(mut listed: Vec<CompanyId>, discovered: Vec<CompanyId>) -> Vec<CompanyId> {
    for company in discovered {
        if !listed.contains(&company) {
            listed.push(company);
        }
    }
    listed.truncate(MAX_LISTED_COMPANIES);
    listed
}
