//! Error types for schema auto-update.

use std::path::PathBuf;

use crate::connection::DbError;

/// Errors that can occur while reconciling models with an Oracle schema.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The model is not registered.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// A catalog query failed while reading the actual table shape.
    #[error("Failed to introspect table '{table}': {source}")]
    Introspection {
        /// Table being introspected.
        table: String,
        /// Driver error.
        #[source]
        source: DbError,
    },

    /// Foreign key discovery failed.
    ///
    /// Reconciliation logs this and carries on with an empty key set.
    #[error("Failed to discover '{table}' foreign keys: {source}")]
    ForeignKeyDiscovery {
        /// Table whose keys were being read.
        table: String,
        /// Driver error.
        #[source]
        source: DbError,
    },

    /// The database kept refusing a DDL lock.
    #[error("Resource busy on '{object}' after {attempts} retries: {source}")]
    TransientLock {
        /// Table or sequence being dropped.
        object: String,
        /// Number of retries performed.
        attempts: u32,
        /// Last driver error.
        #[source]
        source: DbError,
    },

    /// A DDL statement failed.
    #[error("Failed to apply '{sql}': {source}")]
    Apply {
        /// Statement that failed.
        sql: String,
        /// Driver error.
        #[source]
        source: DbError,
    },

    /// An insert hit the primary key's unique constraint.
    #[error("{0}")]
    DuplicateId(String),

    /// Any other driver error.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// A model definition is inconsistent.
    #[error("Invalid model definition: {0}")]
    InvalidModel(String),

    /// A value cannot be converted for the column type.
    #[error("Invalid value for '{property}': {message}")]
    InvalidValue {
        /// Property the value was meant for.
        property: String,
        /// What went wrong.
        message: String,
    },

    /// IO error (reading model, settings or catalog files).
    #[error("IO error on '{path}': {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Multiple errors occurred.
    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<MigrateError>),
}

impl MigrateError {
    /// Returns the driver error behind this error, if any.
    #[must_use]
    pub fn db_error(&self) -> Option<&DbError> {
        match self {
            Self::Introspection { source, .. }
            | Self::ForeignKeyDiscovery { source, .. }
            | Self::TransientLock { source, .. }
            | Self::Apply { source, .. } => Some(source),
            Self::Database(source) => Some(source),
            _ => None,
        }
    }
}

/// Result type for auto-update operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
