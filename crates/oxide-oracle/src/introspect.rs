//! Live schema introspection.
//!
//! Reads the actual columns, indexes and foreign keys of a table from the
//! Oracle data dictionary. Query errors propagate unchanged; grouping of
//! index rows is left to the diff engine.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::connection::{DbError, ExecutionContext, Row};
use crate::error::{MigrateError, Result};
use crate::statement::Statement;

/// One row of `USER_TAB_COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumnRow {
    /// Column name.
    pub column: String,
    /// Catalog type name.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Catalog data length.
    #[serde(default)]
    pub length: Option<u32>,
    /// `Y` or `N`.
    pub nullable: String,
}

impl CatalogColumnRow {
    /// Creates a column row.
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        data_type: impl Into<String>,
        length: Option<u32>,
        nullable: bool,
    ) -> Self {
        Self {
            column: column.into(),
            data_type: data_type.into(),
            length,
            nullable: if nullable { "Y" } else { "N" }.to_string(),
        }
    }
}

/// One row of the index/column join, one per indexed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CatalogIndexRow {
    /// Index name.
    pub index_name: String,
    /// Table name.
    pub table_name: String,
    /// `UNIQUE` or `NONUNIQUE`.
    pub uniqueness: String,
    /// Column name.
    pub column_name: String,
    /// 1-based position of the column in the index.
    pub column_position: u32,
}

impl CatalogIndexRow {
    /// Creates an index row.
    #[must_use]
    pub fn new(
        index_name: impl Into<String>,
        table_name: impl Into<String>,
        unique: bool,
        column_name: impl Into<String>,
        column_position: u32,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            table_name: table_name.into(),
            uniqueness: if unique { "UNIQUE" } else { "NONUNIQUE" }.to_string(),
            column_name: column_name.into(),
            column_position,
        }
    }

    /// Returns true if the index is unique.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.uniqueness.eq_ignore_ascii_case("UNIQUE")
    }
}

/// A live column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActualColumn {
    /// Column name.
    pub name: String,
    /// Normalized catalog type.
    pub db_type: String,
    /// Catalog data length.
    pub length: Option<u32>,
    /// Whether the column allows NULL.
    pub nullable: bool,
}

/// A live index with its columns ordered by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActualIndex {
    /// Catalog index name.
    pub name: String,
    /// Whether the index is unique.
    pub unique: bool,
    /// Column names in position order.
    pub columns: Vec<String>,
}

/// A live foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualForeignKey {
    /// Constraint name.
    pub fk_name: String,
    /// Local column.
    pub fk_column_name: String,
    /// Referenced table.
    pub pk_table_name: String,
    /// Referenced column.
    pub pk_column_name: String,
}

impl ActualForeignKey {
    /// Creates a foreign key.
    #[must_use]
    pub fn new(
        fk_name: impl Into<String>,
        fk_column_name: impl Into<String>,
        pk_table_name: impl Into<String>,
        pk_column_name: impl Into<String>,
    ) -> Self {
        Self {
            fk_name: fk_name.into(),
            fk_column_name: fk_column_name.into(),
            pk_table_name: pk_table_name.into(),
            pk_column_name: pk_column_name.into(),
        }
    }
}

/// Builds the column query for a table.
#[must_use]
pub fn columns_query(table: &str) -> Statement {
    Statement::new(
        "SELECT column_name AS \"column\", data_type AS \"type\", \
         data_length AS \"length\", nullable AS \"nullable\" \
         FROM \"SYS\".\"USER_TAB_COLUMNS\" WHERE table_name = ?",
    )
    .bind(table)
    .parameterize()
}

/// Builds the index query for a table.
#[must_use]
pub fn indexes_query(table: &str) -> Statement {
    Statement::new(
        "SELECT u.INDEX_NAME, u.TABLE_NAME, u.UNIQUENESS, a.COLUMN_NAME, a.COLUMN_POSITION \
         FROM ALL_IND_COLUMNS a INNER JOIN USER_INDEXES u ON a.INDEX_NAME = u.INDEX_NAME \
         WHERE u.TABLE_NAME = ?",
    )
    .bind(table)
    .parameterize()
}

/// Builds the foreign key query for a table.
#[must_use]
pub fn foreign_keys_query(table: &str) -> Statement {
    Statement::new(
        "SELECT uc.constraint_name AS \"fkName\", ucc.column_name AS \"fkColumnName\", \
         rc.table_name AS \"pkTableName\", rcc.column_name AS \"pkColumnName\" \
         FROM USER_CONSTRAINTS uc \
         INNER JOIN USER_CONS_COLUMNS ucc ON uc.constraint_name = ucc.constraint_name \
         INNER JOIN USER_CONSTRAINTS rc ON uc.r_constraint_name = rc.constraint_name \
         INNER JOIN USER_CONS_COLUMNS rcc ON rc.constraint_name = rcc.constraint_name \
         AND ucc.position = rcc.position \
         WHERE uc.constraint_type = 'R' AND uc.table_name = ? \
         ORDER BY uc.constraint_name, ucc.position",
    )
    .bind(table)
    .parameterize()
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> std::result::Result<Vec<T>, DbError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(serde_json::Value::Object(row))
                .map_err(|e| DbError::new(format!("unexpected catalog row: {e}")))
        })
        .collect()
}

/// Fetches the live columns of a table. No rows means the table does not
/// exist.
pub async fn fetch_columns(ctx: &ExecutionContext, table: &str) -> Result<Vec<ActualColumn>> {
    let introspection = |source| MigrateError::Introspection {
        table: table.to_string(),
        source,
    };
    let rows = ctx
        .execute(&columns_query(table))
        .await
        .map_err(introspection)?;
    let rows: Vec<CatalogColumnRow> = decode_rows(rows).map_err(introspection)?;

    let dialect = ctx.dialect();
    Ok(rows
        .into_iter()
        .map(|row| ActualColumn {
            db_type: dialect.normalize_live_type(&row.data_type),
            nullable: row.nullable.eq_ignore_ascii_case("Y"),
            name: row.column,
            length: row.length,
        })
        .collect())
}

/// Fetches the flat index rows of a table.
pub async fn fetch_indexes(ctx: &ExecutionContext, table: &str) -> Result<Vec<CatalogIndexRow>> {
    let introspection = |source| MigrateError::Introspection {
        table: table.to_string(),
        source,
    };
    let rows = ctx
        .execute(&indexes_query(table))
        .await
        .map_err(introspection)?;
    decode_rows(rows).map_err(introspection)
}

/// Fetches the foreign keys declared on a table.
pub async fn fetch_foreign_keys(
    ctx: &ExecutionContext,
    table: &str,
) -> Result<Vec<ActualForeignKey>> {
    let discovery = |source| MigrateError::ForeignKeyDiscovery {
        table: table.to_string(),
        source,
    };
    let rows = ctx
        .execute(&foreign_keys_query(table))
        .await
        .map_err(discovery)?;
    decode_rows(rows).map_err(discovery)
}
