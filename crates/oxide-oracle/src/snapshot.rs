//! Offline catalog snapshots.
//!
//! A [`CatalogSnapshot`] holds the rows the introspection queries would
//! return for each table. [`SnapshotConnection`] answers those queries from
//! it and records every other statement instead of running it, which lets
//! the planner run without a database.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::{Connection, DbError, Row};
use crate::error::{MigrateError, Result};
use crate::introspect::{ActualForeignKey, CatalogColumnRow, CatalogIndexRow};
use crate::statement::{SqlValue, Statement};

/// Catalog rows of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCatalog {
    /// `USER_TAB_COLUMNS` rows.
    #[serde(default)]
    pub columns: Vec<CatalogColumnRow>,
    /// Index/column join rows.
    #[serde(default)]
    pub indexes: Vec<CatalogIndexRow>,
    /// Foreign key rows.
    #[serde(default)]
    pub foreign_keys: Vec<ActualForeignKey>,
}

impl TableCatalog {
    /// Creates an empty table catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column row.
    #[must_use]
    pub fn column(mut self, row: CatalogColumnRow) -> Self {
        self.columns.push(row);
        self
    }

    /// Adds an index row.
    #[must_use]
    pub fn index(mut self, row: CatalogIndexRow) -> Self {
        self.indexes.push(row);
        self
    }

    /// Adds a foreign key row.
    #[must_use]
    pub fn foreign_key(mut self, row: ActualForeignKey) -> Self {
        self.foreign_keys.push(row);
        self
    }
}

/// Captured catalog state, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Tables by name.
    #[serde(default)]
    pub tables: IndexMap<String, TableCatalog>,
}

impl CatalogSnapshot {
    /// Creates an empty snapshot (no tables exist).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>, catalog: TableCatalog) -> Self {
        self.tables.insert(name.into(), catalog);
        self
    }

    /// Gets a table's catalog rows.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&TableCatalog> {
        self.tables.get(table)
    }

    /// Parses a snapshot from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a snapshot from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| MigrateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

#[derive(Debug)]
struct ScriptedFailure {
    pattern: String,
    error: DbError,
    remaining: Option<u32>,
}

/// A [`Connection`] backed by a [`CatalogSnapshot`].
#[derive(Debug, Default)]
pub struct SnapshotConnection {
    snapshot: CatalogSnapshot,
    failures: Mutex<Vec<ScriptedFailure>>,
    executed: Mutex<Vec<String>>,
}

impl SnapshotConnection {
    /// Creates a connection over a snapshot.
    #[must_use]
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    /// Fails every statement containing `pattern` with `error`.
    #[must_use]
    pub fn fail_on(self, pattern: impl Into<String>, error: DbError) -> Self {
        self.script(pattern.into(), error, None)
    }

    /// Fails the first `times` statements containing `pattern` with `error`.
    #[must_use]
    pub fn fail_times(self, pattern: impl Into<String>, error: DbError, times: u32) -> Self {
        self.script(pattern.into(), error, Some(times))
    }

    fn script(self, pattern: String, error: DbError, remaining: Option<u32>) -> Self {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ScriptedFailure {
                pattern,
                error,
                remaining,
            });
        self
    }

    /// Returns the non-catalog statements received so far, including
    /// failed ones.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn scripted_failure(&self, sql: &str) -> Option<DbError> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let failure = failures
            .iter_mut()
            .find(|f| sql.contains(&f.pattern) && f.remaining != Some(0))?;
        if let Some(remaining) = failure.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(failure.error.clone())
    }

    fn catalog_rows(
        &self,
        statement: &Statement,
    ) -> Option<std::result::Result<Vec<Row>, DbError>> {
        let sql = &statement.sql;
        let table = match statement.params.first() {
            Some(SqlValue::Text(table)) => table.as_str(),
            _ => "",
        };
        let catalog = self.snapshot.get(table);
        let rows = if sql.contains("USER_TAB_COLUMNS") {
            to_rows(catalog.map(|c| c.columns.as_slice()).unwrap_or_default())
        } else if sql.contains("ALL_IND_COLUMNS") {
            to_rows(catalog.map(|c| c.indexes.as_slice()).unwrap_or_default())
        } else if sql.contains("USER_CONS_COLUMNS") {
            to_rows(catalog.map(|c| c.foreign_keys.as_slice()).unwrap_or_default())
        } else {
            return None;
        };
        Some(rows)
    }
}

fn to_rows<T: Serialize>(items: &[T]) -> std::result::Result<Vec<Row>, DbError> {
    items
        .iter()
        .map(|item| match serde_json::to_value(item) {
            Ok(serde_json::Value::Object(row)) => Ok(row),
            Ok(other) => Err(DbError::new(format!("catalog row is not an object: {other}"))),
            Err(e) => Err(DbError::new(e.to_string())),
        })
        .collect()
}

#[async_trait]
impl Connection for SnapshotConnection {
    async fn execute(&self, statement: &Statement) -> std::result::Result<Vec<Row>, DbError> {
        let catalog = self.catalog_rows(statement);
        if catalog.is_none() {
            self.executed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(statement.sql.clone());
        }
        if let Some(error) = self.scripted_failure(&statement.sql) {
            debug!(sql = %statement.sql, error = %error, "Scripted failure");
            return Err(error);
        }
        catalog.unwrap_or_else(|| Ok(Vec::new()))
    }
}
