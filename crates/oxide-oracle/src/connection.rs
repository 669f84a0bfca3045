//! The statement-execution collaborator.
//!
//! The auto-update core never talks to a driver directly. Catalog queries and
//! DDL both go through [`Connection::execute`], reached via an
//! [`ExecutionContext`] that the orchestrator owns and passes down.

use std::fmt;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::dialect::OracleDialect;
use crate::statement::Statement;

/// A result row, keyed by column alias.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Oracle error codes the auto-update logic reacts to.
pub mod codes {
    /// `ORA-00001`: unique constraint violated.
    pub const UNIQUE_VIOLATION: &str = "ORA-00001";
    /// `ORA-00054`: resource busy and acquire with NOWAIT specified.
    pub const RESOURCE_BUSY: &str = "ORA-00054";
    /// `ORA-00942`: table or view does not exist.
    pub const TABLE_NOT_FOUND: &str = "ORA-00942";
    /// `ORA-02289`: sequence does not exist.
    pub const SEQUENCE_NOT_FOUND: &str = "ORA-02289";
}

static ORA_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ORA-\d{5}").expect("static pattern is valid"));

/// An error reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbError {
    /// `ORA-NNNNN` code, when known.
    pub code: Option<String>,
    /// Driver message.
    pub message: String,
}

impl DbError {
    /// Creates an error from a driver message, picking the `ORA-` code out of it.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let code = ORA_CODE.find(&message).map(|m| m.as_str().to_string());
        Self { code, message }
    }

    /// Creates an error with an explicit code.
    #[must_use]
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Returns the `ORA-` code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Returns true if this error carries the given code.
    #[must_use]
    pub fn is(&self, code: &str) -> bool {
        self.code() == Some(code)
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) if !self.message.contains(code.as_str()) => {
                write!(f, "{}: {}", code, self.message)
            }
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DbError {}

/// Executes SQL against an Oracle database.
///
/// Implementations wrap a driver connection pool. Rows come back as JSON
/// objects keyed by column alias; DDL returns no rows.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Executes a statement.
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>, DbError>;
}

/// Everything a core operation needs to reach the database.
#[derive(Clone)]
pub struct ExecutionContext {
    connection: Arc<dyn Connection>,
    dialect: OracleDialect,
}

impl ExecutionContext {
    /// Creates a new execution context.
    pub fn new(connection: Arc<dyn Connection>, dialect: OracleDialect) -> Self {
        Self {
            connection,
            dialect,
        }
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &OracleDialect {
        &self.dialect
    }

    /// Executes a statement, logging it first.
    pub async fn execute(&self, statement: &Statement) -> Result<Vec<Row>, DbError> {
        if statement.params.is_empty() {
            debug!(sql = %statement.sql, "Executing SQL");
        } else {
            debug!(sql = %statement.sql, params = ?statement.params, "Executing SQL");
        }
        self.connection.execute(statement).await
    }

    /// Executes plain SQL text without binds.
    pub async fn execute_sql(&self, sql: &str) -> Result<Vec<Row>, DbError> {
        self.execute(&Statement::new(sql)).await
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_parsed_from_message() {
        let err = DbError::new("ORA-00942: table or view does not exist");
        assert_eq!(err.code(), Some(codes::TABLE_NOT_FOUND));
        assert!(err.is(codes::TABLE_NOT_FOUND));
        assert_eq!(err.to_string(), "ORA-00942: table or view does not exist");
    }

    #[test]
    fn test_message_without_code() {
        let err = DbError::new("connection reset");
        assert_eq!(err.code(), None);
        assert!(!err.is(codes::RESOURCE_BUSY));
    }

    #[test]
    fn test_explicit_code_is_displayed() {
        let err = DbError::with_code(codes::RESOURCE_BUSY, "resource busy");
        assert_eq!(err.to_string(), "ORA-00054: resource busy");
    }
}
