//! Auto-update orchestration.
//!
//! [`Migrator`] runs inspect, diff, render and apply for each model. Models
//! are reconciled concurrently up to the configured worker limit, while
//! the steps of one model run strictly in sequence. A failing model never
//! aborts its siblings.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indexmap::IndexSet;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_PARALLEL_LIMIT, OracleSettings, RetryPolicy};
use crate::connection::{Connection, ExecutionContext, codes};
use crate::diff::{DiffOperation, Differ};
use crate::error::{MigrateError, Result};
use crate::introspect::{
    ActualColumn, ActualForeignKey, CatalogIndexRow, fetch_columns, fetch_foreign_keys,
    fetch_indexes,
};
use crate::schema::{ModelDefinition, ModelMetadata};

/// What reconciliation did, or would do, to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Nothing to change.
    UpToDate,
    /// Changes were found but not applied.
    Pending,
    /// The table was altered.
    Altered,
    /// The table was created.
    Created,
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UpToDate => "up to date",
            Self::Pending => "pending",
            Self::Altered => "altered",
            Self::Created => "created",
        })
    }
}

/// Result of reconciling one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Model name.
    pub model: String,
    /// Whether the table differs from the model.
    pub has_changes: bool,
    /// Statements in execution order.
    pub statements: Vec<String>,
    /// Statements joined with `"; "`.
    pub combined_query: String,
    /// What happened.
    pub action: ReconcileAction,
}

impl Reconciliation {
    fn up_to_date(model: &str) -> Self {
        Self {
            model: model.to_string(),
            has_changes: false,
            statements: Vec::new(),
            combined_query: String::new(),
            action: ReconcileAction::UpToDate,
        }
    }

    fn changed(model: &str, statements: Vec<String>, action: ReconcileAction) -> Self {
        Self {
            model: model.to_string(),
            has_changes: true,
            combined_query: statements.join("; "),
            statements,
            action,
        }
    }
}

/// Per-model outcome of a fan-out.
#[derive(Debug)]
pub struct ModelOutcome {
    /// Model name as requested.
    pub model: String,
    /// Reconciliation result.
    pub result: Result<Reconciliation>,
}

/// Splits outcomes into successes, folding failures into one error.
pub fn into_results(outcomes: Vec<ModelOutcome>) -> Result<Vec<Reconciliation>> {
    let mut results = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(r) => results.push(r),
            Err(e) => errors.push(e),
        }
    }
    match errors.len() {
        0 => Ok(results),
        1 => Err(errors.remove(0)),
        _ => Err(MigrateError::Multiple(errors)),
    }
}

/// Reconciles models with an Oracle schema.
pub struct Migrator {
    ctx: ExecutionContext,
    metadata: Arc<dyn ModelMetadata>,
    parallel_limit: usize,
    retry: RetryPolicy,
}

impl Migrator {
    /// Creates a migrator with the default worker limit and retry policy.
    pub fn new(ctx: ExecutionContext, metadata: Arc<dyn ModelMetadata>) -> Self {
        Self {
            ctx,
            metadata,
            parallel_limit: DEFAULT_PARALLEL_LIMIT,
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a migrator configured from data source settings.
    pub fn from_settings(
        connection: Arc<dyn Connection>,
        metadata: Arc<dyn ModelMetadata>,
        settings: &OracleSettings,
    ) -> Self {
        let ctx = ExecutionContext::new(connection, settings.dialect());
        Self::new(ctx, metadata).parallel_limit(settings.parallel_limit())
    }

    /// Sets how many models are reconciled at once.
    #[must_use]
    pub fn parallel_limit(mut self, limit: usize) -> Self {
        self.parallel_limit = limit.max(1);
        self
    }

    /// Sets the retry policy for drops refused with "resource busy".
    #[must_use]
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the execution context.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    fn model(&self, name: &str) -> Result<&ModelDefinition> {
        self.metadata
            .get_model(name)
            .ok_or_else(|| MigrateError::ModelNotFound(name.to_string()))
    }

    fn differ(&self) -> Differ<'_> {
        Differ::new(self.ctx.dialect(), self.metadata.as_ref())
    }

    /// Requested models, each once, in first-seen order.
    fn target_names(&self, names: Option<&[String]>) -> Vec<String> {
        let names = names.map_or_else(|| self.metadata.model_names(), <[String]>::to_vec);
        names
            .into_iter()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Reconciles the given models (all models when `None`).
    ///
    /// In check-only mode nothing is executed; each result carries the
    /// statements that would run.
    pub async fn reconcile(&self, names: Option<&[String]>, check_only: bool) -> Vec<ModelOutcome> {
        let names = self.target_names(names);
        info!(
            models = names.len(),
            limit = self.parallel_limit,
            check_only,
            "Reconciling models"
        );
        stream::iter(names)
            .map(|name| async move {
                let result = self.reconcile_model(&name, check_only).await;
                if let Err(e) = &result {
                    warn!(model = %name, error = %e, "Reconciliation failed");
                }
                ModelOutcome {
                    model: name,
                    result,
                }
            })
            .buffered(self.parallel_limit)
            .collect()
            .await
    }

    /// Reconciles and applies changes for the given models.
    #[doc(alias = "autoupdate")]
    pub async fn reconcile_all(&self, names: Option<&[String]>) -> Vec<ModelOutcome> {
        self.reconcile(names, false).await
    }

    /// Reconciles one model.
    pub async fn reconcile_model(&self, name: &str, check_only: bool) -> Result<Reconciliation> {
        let model = self.model(name)?;
        let table = model.table_name();

        let columns = fetch_columns(&self.ctx, table).await?;
        let index_rows = fetch_indexes(&self.ctx, table).await?;
        let foreign_keys = match fetch_foreign_keys(&self.ctx, table).await {
            Ok(fks) => fks,
            Err(e) => {
                warn!(model = %name, table = %table, error = %e, "Failed to discover foreign keys");
                Vec::new()
            }
        };

        if columns.is_empty() {
            let statements = self.ctx.dialect().create_table_tasks(model);
            if check_only {
                return Ok(Reconciliation::changed(
                    name,
                    statements,
                    ReconcileAction::Pending,
                ));
            }
            self.run_create_tasks(model, &statements).await?;
            return Ok(Reconciliation::changed(
                name,
                statements,
                ReconcileAction::Created,
            ));
        }

        self.alter_table(model, &columns, &index_rows, foreign_keys, check_only)
            .await
    }

    /// Diffs an existing table against its model and applies the result.
    pub async fn alter_table(
        &self,
        model: &ModelDefinition,
        columns: &[ActualColumn],
        index_rows: &[CatalogIndexRow],
        mut foreign_keys: Vec<ActualForeignKey>,
        check_only: bool,
    ) -> Result<Reconciliation> {
        let dialect = self.ctx.dialect();
        let diff = self
            .differ()
            .diff_table(model, columns, index_rows, &mut foreign_keys);

        if diff.is_empty() {
            debug!(model = %model.name, "Table is up to date");
            return Ok(Reconciliation::up_to_date(&model.name));
        }

        let statements = diff.statements(dialect, model);
        if check_only {
            return Ok(Reconciliation::changed(
                &model.name,
                statements,
                ReconcileAction::Pending,
            ));
        }

        info!(
            model = %model.name,
            operations = diff.operations.len(),
            "Altering table"
        );
        for sql in &statements {
            self.apply(sql).await?;
        }
        Ok(Reconciliation::changed(
            &model.name,
            statements,
            ReconcileAction::Altered,
        ))
    }

    async fn apply(&self, sql: &str) -> Result<()> {
        self.ctx
            .execute_sql(sql)
            .await
            .map_err(|source| MigrateError::Apply {
                sql: sql.to_string(),
                source,
            })?;
        Ok(())
    }

    async fn run_create_tasks(&self, model: &ModelDefinition, tasks: &[String]) -> Result<()> {
        info!(
            model = %model.name,
            table = %model.table_name(),
            key = ?self.metadata.id_column_name(&model.name),
            "Creating table"
        );
        for sql in tasks {
            self.apply(sql).await?;
        }
        Ok(())
    }

    /// Returns the statements that create a model's table.
    pub fn create_table_sql(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.ctx.dialect().create_table_tasks(self.model(name)?))
    }

    /// Returns the statements that drop a model's table.
    pub fn drop_table_sql(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.ctx.dialect().drop_table_tasks(self.model(name)?))
    }

    /// Creates a model's table, with its key sequence, trigger and indexes.
    ///
    /// The first failing statement aborts the rest.
    pub async fn create_table(&self, name: &str) -> Result<()> {
        let model = self.model(name)?;
        let tasks = self.ctx.dialect().create_table_tasks(model);
        self.run_create_tasks(model, &tasks).await
    }

    /// Drops a model's table, then its key sequence.
    ///
    /// "Resource busy" is retried with backoff; objects that are already
    /// gone count as dropped.
    pub async fn drop_table(&self, name: &str) -> Result<()> {
        let model = self.model(name)?;
        let dialect = self.ctx.dialect();
        info!(model = %name, table = %model.table_name(), "Dropping table");

        self.drop_object(
            &dialect.drop_table_sql(model),
            model.table_name(),
            codes::TABLE_NOT_FOUND,
        )
        .await?;

        if self.metadata.is_id_generated(name) {
            let sequence = dialect.sequence_name(model.table_name());
            self.drop_object(
                &dialect.drop_sequence_sql(model),
                &sequence,
                codes::SEQUENCE_NOT_FOUND,
            )
            .await?;
        }
        Ok(())
    }

    async fn drop_object(&self, sql: &str, object: &str, missing_code: &str) -> Result<()> {
        let mut retries = 0;
        loop {
            let error = match self.ctx.execute_sql(sql).await {
                Ok(_) => return Ok(()),
                Err(e) => e,
            };

            if error.is(missing_code) {
                debug!(object = %object, "Object does not exist, nothing to drop");
                return Ok(());
            }
            if !error.is(codes::RESOURCE_BUSY) {
                return Err(MigrateError::Apply {
                    sql: sql.to_string(),
                    source: error,
                });
            }
            if retries >= self.retry.max_retries {
                return Err(MigrateError::TransientLock {
                    object: object.to_string(),
                    attempts: retries,
                    source: error,
                });
            }

            retries += 1;
            let delay = self.retry.delay_for(retries);
            warn!(
                object = %object,
                attempt = retries,
                ?delay,
                "Resource busy, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Returns true if every model's table matches its declaration.
    ///
    /// The first model that fails to reconcile fails the whole check.
    #[doc(alias = "check_up_to_date")]
    pub async fn is_actual(&self, names: Option<&[String]>) -> Result<bool> {
        let mut up_to_date = true;
        for outcome in self.reconcile(names, true).await {
            up_to_date &= !outcome.result?.has_changes;
        }
        Ok(up_to_date)
    }

    async fn foreign_key_operations(&self, name: &str) -> Result<Vec<DiffOperation>> {
        let model = self.model(name)?;
        let table = model.table_name();
        if fetch_columns(&self.ctx, table).await?.is_empty() {
            debug!(model = %name, "Table does not exist, skipping foreign keys");
            return Ok(Vec::new());
        }
        let actual = fetch_foreign_keys(&self.ctx, table).await?;
        Ok(self.differ().compute_foreign_key_adds(model, &actual))
    }

    /// Returns the statements adding missing foreign keys, without running
    /// them.
    pub async fn foreign_key_sql(&self, names: Option<&[String]>) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        for name in self.target_names(names) {
            for op in self.foreign_key_operations(&name).await? {
                if let DiffOperation::AddForeignKey { sql, .. } = op {
                    statements.push(sql);
                }
            }
        }
        Ok(statements)
    }

    /// Adds missing foreign keys, one model and one key at a time.
    ///
    /// Kept apart from [`reconcile`](Self::reconcile) because keys need
    /// their target tables to exist. Returns the statements executed.
    #[doc(alias = "create_foreign_keys_for_all")]
    pub async fn create_foreign_keys(&self, names: Option<&[String]>) -> Result<Vec<String>> {
        let mut executed = Vec::new();
        for name in self.target_names(names) {
            for op in self.foreign_key_operations(&name).await? {
                if let DiffOperation::AddForeignKey { name: fk, sql } = op {
                    self.apply(&sql).await?;
                    info!(model = %name, constraint = %fk, "Created foreign key");
                    executed.push(sql);
                }
            }
        }
        Ok(executed)
    }
}

impl fmt::Debug for Migrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("ctx", &self.ctx)
            .field("parallel_limit", &self.parallel_limit)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DbError;
    use crate::dialect::OracleDialect;
    use crate::introspect::CatalogColumnRow;
    use crate::schema::{AbstractType, ModelRegistry, PropertyDef};
    use crate::snapshot::{CatalogSnapshot, SnapshotConnection, TableCatalog};

    fn registry() -> Arc<ModelRegistry> {
        let model = ModelDefinition::new("Customer")
            .table("t")
            .property(
                PropertyDef::new("id", AbstractType::Number)
                    .primary_key()
                    .generated(),
            )
            .property(PropertyDef::new("name", AbstractType::String).length(50));
        Arc::new(ModelRegistry::new().with_model(model).unwrap())
    }

    fn migrator(conn: Arc<SnapshotConnection>) -> Migrator {
        let ctx = ExecutionContext::new(conn, OracleDialect::new());
        Migrator::new(ctx, registry()).retry_policy(RetryPolicy::immediate(5))
    }

    #[test]
    fn test_into_results_folds_errors() {
        let outcomes = vec![
            ModelOutcome {
                model: "a".to_string(),
                result: Err(MigrateError::ModelNotFound("a".to_string())),
            },
            ModelOutcome {
                model: "b".to_string(),
                result: Err(MigrateError::ModelNotFound("b".to_string())),
            },
        ];
        assert!(matches!(
            into_results(outcomes),
            Err(MigrateError::Multiple(ref errors)) if errors.len() == 2
        ));
    }

    #[tokio::test]
    async fn test_check_only_does_not_execute() {
        let conn = Arc::new(SnapshotConnection::new(CatalogSnapshot::new()));
        let migrator = migrator(conn.clone());

        let result = migrator.reconcile_model("Customer", true).await.unwrap();
        assert!(result.has_changes);
        assert_eq!(result.action, ReconcileAction::Pending);
        assert_eq!(result.statements.len(), 3);
        assert!(conn.executed().is_empty());
    }

    #[tokio::test]
    async fn test_up_to_date_table() {
        let snapshot = CatalogSnapshot::new().table(
            "t",
            TableCatalog::new()
                .column(CatalogColumnRow::new("id", "NUMBER", Some(22), false))
                .column(CatalogColumnRow::new("name", "VARCHAR2", Some(50), true)),
        );
        let conn = Arc::new(SnapshotConnection::new(snapshot));
        let migrator = migrator(conn.clone());

        let result = migrator.reconcile_model("Customer", false).await.unwrap();
        assert_eq!(result.action, ReconcileAction::UpToDate);
        assert!(result.combined_query.is_empty());
        assert!(conn.executed().is_empty());
    }

    #[tokio::test]
    async fn test_drop_table_gives_up_after_retries() {
        let conn = Arc::new(SnapshotConnection::new(CatalogSnapshot::new()).fail_on(
            "DROP TABLE",
            DbError::with_code(codes::RESOURCE_BUSY, "resource busy"),
        ));
        let migrator = migrator(conn.clone());

        let err = migrator.drop_table("Customer").await.unwrap_err();
        assert!(matches!(err, MigrateError::TransientLock { attempts: 5, .. }));
        assert_eq!(conn.executed().len(), 6);
    }

    #[tokio::test]
    async fn test_drop_table_other_error_is_apply_failure() {
        let conn = Arc::new(SnapshotConnection::new(CatalogSnapshot::new()).fail_on(
            "DROP TABLE",
            DbError::new("ORA-01031: insufficient privileges"),
        ));
        let err = migrator(conn).drop_table("Customer").await.unwrap_err();
        assert!(matches!(err, MigrateError::Apply { .. }));
    }

    /// Registry whose keys are all assigned by the application.
    struct AssignedKeys(ModelRegistry);

    impl ModelMetadata for AssignedKeys {
        fn get_model(&self, name: &str) -> Option<&ModelDefinition> {
            self.0.get_model(name)
        }

        fn model_names(&self) -> Vec<String> {
            self.0.model_names()
        }

        fn is_id_generated(&self, _name: &str) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_drop_table_asks_metadata_for_generated_key() {
        let conn = Arc::new(SnapshotConnection::new(CatalogSnapshot::new()));
        let ctx = ExecutionContext::new(conn.clone(), OracleDialect::new());
        let metadata = AssignedKeys(Arc::try_unwrap(registry()).unwrap());
        let migrator = Migrator::new(ctx, Arc::new(metadata));

        migrator.drop_table("Customer").await.unwrap();
        assert_eq!(conn.executed(), vec!["DROP TABLE \"t\"".to_string()]);
    }

    #[test]
    fn test_target_names_are_deduplicated() {
        let conn = Arc::new(SnapshotConnection::new(CatalogSnapshot::new()));
        let requested = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(
            migrator(conn).target_names(Some(&requested)),
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[tokio::test]
    async fn test_create_table_aborts_on_failure() {
        let conn = Arc::new(SnapshotConnection::new(CatalogSnapshot::new()).fail_on(
            "CREATE SEQUENCE",
            DbError::new("ORA-00955: name is already used by an existing object"),
        ));
        let migrator = migrator(conn.clone());

        let err = migrator.create_table("Customer").await.unwrap_err();
        assert!(
            matches!(err, MigrateError::Apply { ref sql, .. } if sql.starts_with("CREATE SEQUENCE"))
        );
        assert_eq!(conn.executed().len(), 2);
    }
}
