//! Oracle schema auto-update for oxide model definitions.
//!
//! `oxide-oracle` reconciles a live Oracle schema with declared models. For
//! each model it:
//! - reads the table's columns, indexes and foreign keys from the data
//!   dictionary
//! - diffs them against the declared properties, indexes and keys
//! - renders Oracle DDL (`ALTER TABLE`, index blocks run through
//!   `EXECUTE IMMEDIATE`, sequence and trigger pairs for generated keys)
//! - applies it, or only reports it in check-only mode
//!
//! # Architecture
//!
//! - **Schema** - Model metadata (`ModelDefinition`, `ModelMetadata`)
//! - **Dialect** - Identifier escaping, type mapping and DDL rendering
//! - **Introspect** - Catalog queries for the actual table shape
//! - **Diff** - Column, foreign key and index comparison
//! - **Executor** - Orchestration across models with bounded concurrency
//!
//! The database is reached through the [`Connection`](connection::Connection)
//! trait. [`SnapshotConnection`](snapshot::SnapshotConnection) answers
//! catalog queries from a captured snapshot, which is enough to plan changes
//! offline.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use oxide_oracle::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> oxide_oracle::error::Result<()> {
//! let customer = ModelDefinition::new("Customer")
//!     .table("CUSTOMER")
//!     .property(PropertyDef::new("id", AbstractType::Number).primary_key().generated())
//!     .property(PropertyDef::new("name", AbstractType::String).length(50));
//! let registry = ModelRegistry::new().with_model(customer)?;
//!
//! let connection = Arc::new(SnapshotConnection::new(CatalogSnapshot::new()));
//! let ctx = ExecutionContext::new(connection, OracleDialect::new());
//! let migrator = Migrator::new(ctx, Arc::new(registry));
//!
//! let plan = migrator.reconcile_model("Customer", true).await?;
//! assert!(plan.has_changes);
//! assert!(plan.statements[0].starts_with("CREATE TABLE \"CUSTOMER\""));
//! # Ok(())
//! # }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show the statements that would bring the schema up to date
//! oxide-oracle --models models.json --catalog catalog.json plan
//!
//! # Exit with status 1 when changes are pending
//! oxide-oracle --models models.json --catalog catalog.json check
//!
//! # Print the DDL creating one model's table
//! oxide-oracle --models models.json create-sql Customer
//! ```

pub mod config;
pub mod connection;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod executor;
pub mod introspect;
pub mod schema;
pub mod snapshot;
pub mod statement;
pub mod value;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{OracleSettings, RetryPolicy};
    pub use crate::connection::{Connection, DbError, ExecutionContext, Row, codes};
    pub use crate::dialect::OracleDialect;
    pub use crate::dialect::ddl::IndexStatement;
    pub use crate::diff::{ColumnOps, DiffOperation, Differ, TableDiff, group_indexes};
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::{
        Migrator, ModelOutcome, ReconcileAction, Reconciliation, into_results,
    };
    pub use crate::introspect::{
        ActualColumn, ActualForeignKey, ActualIndex, CatalogColumnRow, CatalogIndexRow,
    };
    pub use crate::schema::{
        AbstractType, ColumnMetadata, ForeignKeyDef, IndexDef, ModelDefinition, ModelMetadata,
        ModelRegistry, PropertyDef, PropertyIndex,
    };
    pub use crate::snapshot::{CatalogSnapshot, SnapshotConnection, TableCatalog};
    pub use crate::statement::{SqlValue, Statement};
    pub use crate::value::{from_column_value, to_column_value, translate_insert_error};
}
