//! Write-Statement Guard
//!
//! Every query handed to the connection manager passes through [`check`] before it
//! reaches a driver. There is no flag to skip it.
//!
//! # Validation Strategy
//! - Quoted literals and identifiers are replaced with `''` so their text cannot
//!   trigger a match
//! - Comments are removed
//! - The remainder is split on `;` and the first token of every statement is
//!   compared against the mutating verbs
//!
//! Quoting and comment rules follow the engine that will run the query:
//! - `SQLite`: `'`, `"` and `` ` `` quote with doubling only, `[...]` quotes an
//!   identifier, `--` and `/* */` are comments
//! - `MySQL`: backslash escapes inside `'` and `"`, `#` and `-- ` (dash dash
//!   space) are line comments, `/*! */` bodies are executed and therefore
//!   scanned. Backslash handling depends on `sql_mode`, so a query must pass
//!   both with and without backslash escapes.
//!
//! This is a textual heuristic, not a SQL parser. A statement that starts with an
//! unquoted identifier spelled like a mutating verb is rejected even though it
//! would only read. Parameter binding remains the primary defense; the guard
//! catches anything that slips past it.

use tracing::warn;

use crate::engine::DatabaseType;
use crate::error::{AppError, Result};

/// SQL verbs that alter persisted state
pub const MUTATING_VERBS: &[&str] =
    &["INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "REPLACE"];

/// Lexical rules that decide where literals and comments end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dialect {
    backslash_escapes: bool,
    hash_comments: bool,
    /// `--` only opens a comment when followed by whitespace or end of input
    dash_comment_needs_space: bool,
    bracket_identifiers: bool,
    /// `/*! ... */` bodies run as SQL
    executable_comments: bool,
}

const SQLITE: Dialect = Dialect {
    backslash_escapes: false,
    hash_comments: false,
    dash_comment_needs_space: false,
    bracket_identifiers: true,
    executable_comments: false,
};

const MYSQL: Dialect = Dialect {
    backslash_escapes: true,
    hash_comments: true,
    dash_comment_needs_space: true,
    bracket_identifiers: false,
    executable_comments: true,
};

const MYSQL_NO_BACKSLASH_ESCAPES: Dialect = Dialect {
    backslash_escapes: false,
    ..MYSQL
};

/// Readings a query must survive on `engine`
const fn dialects(engine: DatabaseType) -> &'static [Dialect] {
    match engine {
        DatabaseType::MySQL => &[MYSQL, MYSQL_NO_BACKSLASH_ESCAPES],
        DatabaseType::SQLite => &[SQLITE],
    }
}

/// Check that `sql` contains no mutating statement when run on `engine`.
///
/// # Returns
/// * `Ok(())` if every statement starts with a non-mutating token
/// * `Err(AppError::Validation)` if the query is empty
/// * `Err(AppError::SecurityViolation)` naming the first mutating verb found
pub fn check(sql: &str, engine: DatabaseType) -> Result<()> {
    if sql.trim().is_empty() {
        return Err(AppError::validation("Query cannot be empty"));
    }

    for dialect in dialects(engine) {
        let cleaned = strip_literals_and_comments(sql, *dialect);

        for statement in split_statements(&cleaned) {
            let token = first_token(statement).to_uppercase();
            if MUTATING_VERBS.contains(&token.as_str()) {
                warn!(verb = %token, engine = %engine, "rejected mutating statement");
                return Err(AppError::security_violation(token));
            }
        }
    }

    Ok(())
}

/// Replace quoted text with `''` and drop comments in a single left-to-right pass.
///
/// Whatever opens first wins, so a quote inside a comment and a comment marker
/// inside a quote are both ignored. A quote with no closing partner is kept as
/// ordinary text.
fn strip_literals_and_comments(sql: &str, dialect: Dialect) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut result = String::with_capacity(sql.len());
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();

        match ch {
            '\'' | '"' | '`' => match find_closing_quote(&chars, i, dialect) {
                Some(end) => {
                    result.push_str("''");
                    i = end + 1;
                }
                None => {
                    result.push(ch);
                    i += 1;
                }
            },
            '[' if dialect.bracket_identifiers => {
                match chars[i + 1..].iter().position(|c| *c == ']') {
                    Some(offset) => {
                        result.push_str("''");
                        i += offset + 2;
                    }
                    None => {
                        result.push(ch);
                        i += 1;
                    }
                }
            }
            '-' if next == Some('-') && opens_dash_comment(&chars, i, dialect) => {
                i = skip_line(&chars, i + 2);
            }
            '#' if dialect.hash_comments => {
                i = skip_line(&chars, i + 1);
            }
            '/' if next == Some('*') => {
                if dialect.executable_comments && chars.get(i + 2) == Some(&'!') {
                    // Body runs as SQL: drop the marker and version digits, keep scanning
                    i += 3;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    result.push(' ');
                    continue;
                }

                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
                result.push(' ');
            }
            _ => {
                result.push(ch);
                i += 1;
            }
        }
    }

    result
}

fn opens_dash_comment(chars: &[char], start: usize, dialect: Dialect) -> bool {
    !dialect.dash_comment_needs_space
        || chars.get(start + 2).map_or(true, |c| c.is_whitespace() || c.is_control())
}

/// Index of the newline ending the line that contains `from`, or the end of input
fn skip_line(chars: &[char], from: usize) -> usize {
    chars[from.min(chars.len())..]
        .iter()
        .position(|c| *c == '\n')
        .map_or(chars.len(), |offset| from + offset)
}

/// Index of the quote closing the quoted text that opens at `start`.
///
/// A doubled quote (`'it''s'`) stays inside. Backslash escapes apply to string
/// quotes only, and only when the dialect has them.
fn find_closing_quote(chars: &[char], start: usize, dialect: Dialect) -> Option<usize> {
    let quote = chars[start];
    let escapes = dialect.backslash_escapes && quote != '`';
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i] {
            '\\' if escapes => i += 2,
            c if c == quote => {
                if chars.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }

    None
}

/// Split on statement terminators, dropping blank statements
fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

/// Leading keyword of a statement (letters, digits and underscores)
fn first_token(statement: &str) -> &str {
    let trimmed = statement.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
    let end = trimmed
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}
