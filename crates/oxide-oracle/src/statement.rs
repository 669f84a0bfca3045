//! Parameterized statements.
//!
//! Catalog queries and value fragments are built with `?` placeholders and
//! rewritten to Oracle's positional `:1`, `:2`, ... binds by
//! [`Statement::parameterize`]. Identifiers never go through binds; they are
//! escaped by [`OracleDialect::escape_name`](crate::dialect::OracleDialect::escape_name).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A bind value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// Text.
    Text(String),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// SQL text plus its bind values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Bind values, in placeholder order.
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Creates a statement without binds.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Appends a bind value.
    #[must_use]
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Rewrites `?` placeholders into positional `:n` binds.
    ///
    /// Question marks inside quoted literals or identifiers are left alone.
    #[must_use]
    pub fn parameterize(mut self) -> Self {
        let mut out = String::with_capacity(self.sql.len() + 8);
        let mut quote: Option<char> = None;
        let mut index = 0;
        for ch in self.sql.chars() {
            match (quote, ch) {
                (None, '\'' | '"') => {
                    quote = Some(ch);
                    out.push(ch);
                }
                (Some(q), c) if c == q => {
                    quote = None;
                    out.push(ch);
                }
                (None, '?') => {
                    index += 1;
                    out.push(':');
                    out.push_str(&index.to_string());
                }
                _ => out.push(ch),
            }
        }
        self.sql = out;
        self
    }

    /// Returns true if the statement has no SQL text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Quotes a string literal, doubling embedded single quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
