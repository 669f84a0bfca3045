//! Oracle dialect.
//!
//! [`OracleDialect`] knows how Oracle spells identifiers, column types and
//! DDL. Naming lives here, the type mapper in [`types`], and statement
//! rendering in [`ddl`].

pub mod ddl;
pub mod types;

use crate::schema::ModelDefinition;

/// SQL generation for Oracle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleDialect {
    user: Option<String>,
}

impl OracleDialect {
    /// Creates a dialect for an unnamed connection user.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection user. Models owned by another schema are
    /// qualified with it.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Returns the connection user.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Quotes an identifier. Dotted names are quoted part by part.
    ///
    /// ```
    /// use oxide_oracle::dialect::OracleDialect;
    ///
    /// let dialect = OracleDialect::new();
    /// assert_eq!(dialect.escape_name("HR.EMP"), "\"HR\".\"EMP\"");
    /// ```
    #[must_use]
    pub fn escape_name(&self, name: &str) -> String {
        name.split('.')
            .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Returns the escaped, possibly schema-qualified table name of a model.
    #[must_use]
    pub fn table_escaped(&self, model: &ModelDefinition) -> String {
        let table = self.escape_name(model.table_name());
        match model.schema.as_deref() {
            Some(schema) if !schema.is_empty() && Some(schema) != self.user() => {
                format!("{}.{}", self.escape_name(schema), table)
            }
            _ => table,
        }
    }

    /// Returns the escaped column for a property.
    #[must_use]
    pub fn column_escaped(&self, model: &ModelDefinition, property: &str) -> String {
        self.escape_name(model.column_for(property))
    }

    /// Returns the (unescaped) name of the key sequence for a table.
    #[must_use]
    pub fn sequence_name(&self, table: &str) -> String {
        format!("{table}_id_sequence")
    }

    /// Returns the (unescaped) name of the key trigger for a table.
    #[must_use]
    pub fn trigger_name(&self, table: &str) -> String {
        format!("{table}_id_trigger")
    }
}
