//! Diff engine.
//!
//! Compares a model's declared shape with the live table and produces the
//! operations that converge the table. Columns, foreign key drops and
//! indexes are diffed here; foreign key additions are computed separately
//! because they depend on other tables existing.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::dialect::OracleDialect;
use crate::dialect::ddl::IndexStatement;
use crate::dialect::types::actual_type;
use crate::introspect::{ActualColumn, ActualForeignKey, ActualIndex, CatalogIndexRow};
use crate::schema::{ForeignKeyDef, IndexDef, ModelDefinition, ModelMetadata};

/// Prefix of index names Oracle generates for constraints.
pub const SYSTEM_INDEX_PREFIX: &str = "SYS";

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOperation {
    /// Column definitions to add, e.g. `"name" VARCHAR2(50)`.
    AddColumns(Vec<String>),
    /// Column modifications, e.g. `"name" NOT NULL`.
    ModifyColumns(Vec<String>),
    /// Escaped columns to drop.
    DropColumns(Vec<String>),
    /// Foreign key constraint to drop.
    DropForeignKey(String),
    /// Foreign key constraint to add, with its rendered statement.
    AddForeignKey {
        /// Constraint name.
        name: String,
        /// `ALTER TABLE ... ADD CONSTRAINT` statement.
        sql: String,
    },
    /// Index to create.
    AddIndex {
        /// Physical index name.
        name: String,
        /// Column names in order.
        columns: Vec<String>,
        /// Whether the index is unique.
        unique: bool,
    },
    /// Index to drop.
    DropIndex {
        /// Physical index name.
        name: String,
    },
}

impl DiffOperation {
    /// Returns the `ALTER TABLE` clause for column and constraint operations.
    #[must_use]
    pub fn alter_clause(&self, dialect: &OracleDialect) -> Option<String> {
        match self {
            Self::AddColumns(defs) => Some(format!("ADD ({})", defs.join(", "))),
            Self::ModifyColumns(defs) => Some(format!("MODIFY ({})", defs.join(", "))),
            Self::DropColumns(cols) => Some(format!("DROP ({})", cols.join(", "))),
            Self::DropForeignKey(name) => {
                Some(format!("DROP CONSTRAINT {}", dialect.escape_name(name)))
            }
            _ => None,
        }
    }

    /// Returns the index statement for index operations.
    #[must_use]
    pub fn index_statement(&self) -> Option<IndexStatement> {
        match self {
            Self::AddIndex {
                name,
                columns,
                unique,
            } => Some(IndexStatement::Create {
                name: name.clone(),
                columns: columns.clone(),
                unique: *unique,
            }),
            Self::DropIndex { name } => Some(IndexStatement::Drop { name: name.clone() }),
            _ => None,
        }
    }
}

/// Column changes, each list rendered as one clause group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOps {
    /// Column definitions to add.
    pub add: Vec<String>,
    /// Column modifications.
    pub modify: Vec<String>,
    /// Escaped columns to drop.
    pub drop: Vec<String>,
}

impl ColumnOps {
    /// Returns true if nothing changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.modify.is_empty() && self.drop.is_empty()
    }

    /// Converts the non-empty groups to operations.
    #[must_use]
    pub fn into_operations(self) -> Vec<DiffOperation> {
        let mut ops = Vec::new();
        if !self.add.is_empty() {
            ops.push(DiffOperation::AddColumns(self.add));
        }
        if !self.modify.is_empty() {
            ops.push(DiffOperation::ModifyColumns(self.modify));
        }
        if !self.drop.is_empty() {
            ops.push(DiffOperation::DropColumns(self.drop));
        }
        ops
    }
}

/// Every change computed for one table, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDiff {
    /// Operations.
    pub operations: Vec<DiffOperation>,
}

impl TableDiff {
    /// Returns true if the table is up to date.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns the `ALTER TABLE` clause groups.
    #[must_use]
    pub fn alter_clauses(&self, dialect: &OracleDialect) -> Vec<String> {
        self.operations
            .iter()
            .filter_map(|op| op.alter_clause(dialect))
            .collect()
    }

    /// Returns the index statements.
    #[must_use]
    pub fn index_statements(&self) -> Vec<IndexStatement> {
        self.operations
            .iter()
            .filter_map(DiffOperation::index_statement)
            .collect()
    }

    /// Renders the diff: at most one `ALTER TABLE` followed by at most one
    /// index block.
    #[must_use]
    pub fn statements(&self, dialect: &OracleDialect, model: &ModelDefinition) -> Vec<String> {
        dialect
            .alter_table_sql(model, &self.alter_clauses(dialect))
            .into_iter()
            .chain(dialect.index_block(model, &self.index_statements()))
            .collect()
    }
}

/// Groups flat index rows by name, ordering columns by catalog position.
#[must_use]
pub fn group_indexes(rows: &[CatalogIndexRow]) -> Vec<ActualIndex> {
    let mut grouped: IndexMap<&str, (bool, Vec<(u32, &str)>)> = IndexMap::new();
    for row in rows {
        grouped
            .entry(row.index_name.as_str())
            .or_insert_with(|| (row.is_unique(), Vec::new()))
            .1
            .push((row.column_position, row.column_name.as_str()));
    }
    grouped
        .into_iter()
        .map(|(name, (unique, mut columns))| {
            columns.sort_by_key(|(position, _)| *position);
            ActualIndex {
                name: name.to_string(),
                unique,
                columns: columns.into_iter().map(|(_, c)| c.to_string()).collect(),
            }
        })
        .collect()
}

/// Computes the changes needed for one model.
pub struct Differ<'a> {
    dialect: &'a OracleDialect,
    metadata: &'a dyn ModelMetadata,
}

impl<'a> Differ<'a> {
    /// Creates a differ.
    pub fn new(dialect: &'a OracleDialect, metadata: &'a dyn ModelMetadata) -> Self {
        Self { dialect, metadata }
    }

    /// Computes column additions, modifications and drops.
    ///
    /// Primary key columns are never touched. Soft-deleted properties are
    /// neither added nor modified.
    #[must_use]
    pub fn compute_column_ops(
        &self,
        model: &ModelDefinition,
        actual: &[ActualColumn],
    ) -> ColumnOps {
        let mut ops = ColumnOps::default();
        let key_columns: HashSet<&str> = model.id_properties().map(|p| p.column_name()).collect();

        for property in model.properties.iter().filter(|p| !p.primary_key) {
            let column = property.column_name();
            let escaped = self.dialect.escape_name(column);
            let found = actual.iter().find(|a| a.name == column);

            match found {
                None if !property.deleted => {
                    ops.add.push(format!(
                        "{} {}",
                        escaped,
                        self.dialect.column_definition(property)
                    ));
                }
                Some(found) if !property.deleted => {
                    let mut clause = String::new();
                    let new_type = self.dialect.column_type(property);
                    let old_type = actual_type(&found.db_type, found.length, &new_type);
                    if !old_type.eq_ignore_ascii_case(&new_type) {
                        clause = format!("{escaped} {new_type}");
                    }
                    if found.nullable != property.nullable {
                        if clause.is_empty() {
                            clause = escaped;
                        }
                        clause.push_str(if property.nullable { " NULL" } else { " NOT NULL" });
                    }
                    if !clause.is_empty() {
                        ops.modify.push(clause);
                    }
                }
                _ => {}
            }
        }

        for column in actual {
            if key_columns.contains(column.name.as_str()) {
                continue;
            }
            if model.property_for_column(&column.name).is_none() {
                ops.drop.push(self.dialect.escape_name(&column.name));
            }
        }

        ops
    }

    /// Resolves the column and table a declared key should reference.
    fn foreign_key_target(&self, fk: &ForeignKeyDef) -> (String, String) {
        match self.metadata.get_model(&fk.entity) {
            Some(target) => (
                target.table_name().to_string(),
                target.column_for(&fk.entity_key).to_string(),
            ),
            None => (fk.entity.clone(), fk.entity_key.clone()),
        }
    }

    fn declared_foreign_key<'m>(
        model: &'m ModelDefinition,
        name: &str,
    ) -> Option<&'m ForeignKeyDef> {
        model
            .foreign_keys
            .get(name)
            .or_else(|| model.foreign_keys.values().find(|fk| fk.name == name))
    }

    /// Computes the foreign keys to drop.
    ///
    /// A live key is dropped when nothing declares it by name or when its
    /// local column, target table or target column changed. Dropped keys are
    /// removed from `actual` so a later add pass recreates them.
    pub fn compute_foreign_key_drops(
        &self,
        model: &ModelDefinition,
        actual: &mut Vec<ActualForeignKey>,
    ) -> Vec<DiffOperation> {
        let mut drops = Vec::new();
        actual.retain(|live| {
            let keep = match Self::declared_foreign_key(model, &live.fk_name) {
                Some(declared) => {
                    let (table, column) = self.foreign_key_target(declared);
                    model.column_for(&declared.foreign_key) == live.fk_column_name
                        && column == live.pk_column_name
                        && table == live.pk_table_name
                }
                None => false,
            };
            if !keep {
                drops.push(DiffOperation::DropForeignKey(live.fk_name.clone()));
            }
            keep
        });
        drops
    }

    /// Computes the foreign keys to add: declared keys not present by name
    /// whose target model is registered.
    #[must_use]
    pub fn compute_foreign_key_adds(
        &self,
        model: &ModelDefinition,
        actual: &[ActualForeignKey],
    ) -> Vec<DiffOperation> {
        model
            .foreign_keys
            .values()
            .filter(|fk| !actual.iter().any(|live| live.fk_name == fk.name))
            .filter_map(|fk| {
                let target = self.metadata.get_model(&fk.entity)?;
                Some(DiffOperation::AddForeignKey {
                    name: fk.name.clone(),
                    sql: self.dialect.add_foreign_key_sql(model, fk, target),
                })
            })
            .collect()
    }

    /// Strips the table prefix from a catalog index name:
    /// `idx_<table>_x` becomes `idx_x` and `<table>_x` becomes `x`.
    #[must_use]
    pub fn model_index_name(model: &ModelDefinition, index_name: &str) -> String {
        let table = model.table_name();
        if let Some(rest) = index_name
            .strip_prefix("idx_")
            .and_then(|s| s.strip_prefix(table))
            .and_then(|s| s.strip_prefix('_'))
        {
            return format!("idx_{rest}");
        }
        index_name
            .strip_prefix(table)
            .and_then(|s| s.strip_prefix('_'))
            .unwrap_or(index_name)
            .to_string()
    }

    fn index_matches(
        &self,
        model: &ModelDefinition,
        key: &str,
        declared: &IndexDef,
        index_name: &str,
    ) -> bool {
        index_name == key
            || Self::model_index_name(model, index_name) == key
            || index_name == self.dialect.generated_index_name(model, declared)
    }

    fn declared_columns(model: &ModelDefinition, declared: &IndexDef) -> Vec<String> {
        declared
            .column_names()
            .iter()
            .map(|c| model.column_for(c).to_string())
            .collect()
    }

    /// Computes index drops and creations.
    ///
    /// System indexes are never dropped. An index whose columns differ in
    /// count or order from its declaration is dropped and recreated.
    #[must_use]
    pub fn compute_index_ops(
        &self,
        model: &ModelDefinition,
        actual: &[ActualIndex],
    ) -> Vec<DiffOperation> {
        let mut ops = Vec::new();
        let mut surviving: Vec<&ActualIndex> = Vec::new();

        for index in actual {
            if index.name.starts_with(SYSTEM_INDEX_PREFIX) {
                continue;
            }

            let declared = model
                .indexes
                .iter()
                .find(|(key, def)| self.index_matches(model, key, def, &index.name));

            let keep = match declared {
                Some((_, def)) => Self::declared_columns(model, def) == index.columns,
                None => {
                    let name = Self::model_index_name(model, &index.name);
                    model
                        .get_property(&name)
                        .or_else(|| model.property_for_column(&name))
                        .and_then(|p| p.index.as_ref())
                        .is_some_and(|i| !i.is_withdrawn())
                }
            };

            if keep {
                surviving.push(index);
            } else {
                ops.push(DiffOperation::DropIndex {
                    name: index.name.clone(),
                });
            }
        }

        for (key, def) in &model.indexes {
            if def.column_names().is_empty() {
                continue;
            }
            let exists = surviving
                .iter()
                .any(|index| self.index_matches(model, key, def, &index.name));
            if !exists {
                ops.push(DiffOperation::AddIndex {
                    name: self.dialect.generated_index_name(model, def),
                    columns: Self::declared_columns(model, def),
                    unique: def.is_unique(),
                });
            }
        }

        ops
    }

    /// Computes the full automatic diff of a table: columns, foreign key
    /// drops, then indexes.
    pub fn diff_table(
        &self,
        model: &ModelDefinition,
        columns: &[ActualColumn],
        index_rows: &[CatalogIndexRow],
        foreign_keys: &mut Vec<ActualForeignKey>,
    ) -> TableDiff {
        let mut operations = self.compute_column_ops(model, columns).into_operations();
        operations.extend(self.compute_foreign_key_drops(model, foreign_keys));
        operations.extend(self.compute_index_ops(model, &group_indexes(index_rows)));
        TableDiff { operations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AbstractType, ModelRegistry, PropertyDef, PropertyIndex};

    fn column(name: &str, db_type: &str, length: Option<u32>, nullable: bool) -> ActualColumn {
        ActualColumn {
            name: name.to_string(),
            db_type: db_type.to_string(),
            length,
            nullable,
        }
    }

    fn index(name: &str, columns: &[&str]) -> ActualIndex {
        ActualIndex {
            name: name.to_string(),
            unique: false,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn customer() -> ModelDefinition {
        ModelDefinition::new("Customer")
            .table("t")
            .property(
                PropertyDef::new("id", AbstractType::Number)
                    .primary_key()
                    .generated(),
            )
            .property(PropertyDef::new("name", AbstractType::String).length(50))
    }

    fn with_differ<R>(models: &[ModelDefinition], f: impl FnOnce(&Differ<'_>) -> R) -> R {
        let mut registry = ModelRegistry::new();
        for model in models {
            registry.register(model.clone()).unwrap();
        }
        let dialect = OracleDialect::new();
        let differ = Differ::new(&dialect, &registry);
        f(&differ)
    }

    #[test]
    fn test_no_changes() {
        let model = customer();
        let actual = vec![
            column("id", "NUMBER", Some(22), false),
            column("name", "VARCHAR2", Some(50), true),
        ];
        let ops = with_differ(&[], |d| d.compute_column_ops(&model, &actual));
        assert!(ops.is_empty());
    }

    #[test]
    fn test_detect_nullability_change() {
        let model = ModelDefinition::new("Customer")
            .table("t")
            .property(PropertyDef::new("id", AbstractType::Number).primary_key())
            .property(PropertyDef::new("name", AbstractType::String).length(50).not_null());
        let actual = vec![
            column("id", "NUMBER", Some(22), false),
            column("name", "VARCHAR2", Some(50), true),
        ];
        let ops = with_differ(&[], |d| d.compute_column_ops(&model, &actual));

        assert!(ops.add.is_empty());
        assert!(ops.drop.is_empty());
        assert_eq!(ops.modify, vec!["\"name\" NOT NULL"]);
        assert_eq!(
            ops.into_operations()[0].alter_clause(&OracleDialect::new()).unwrap(),
            "MODIFY (\"name\" NOT NULL)"
        );
    }

    #[test]
    fn test_type_and_nullability_combine() {
        let model = ModelDefinition::new("Customer")
            .table("t")
            .property(PropertyDef::new("name", AbstractType::String).length(80).not_null());
        let actual = vec![column("name", "VARCHAR2", Some(50), true)];
        let ops = with_differ(&[], |d| d.compute_column_ops(&model, &actual));
        assert_eq!(ops.modify, vec!["\"name\" VARCHAR2(80) NOT NULL"]);
    }

    #[test]
    fn test_type_comparison_is_case_insensitive() {
        let model = ModelDefinition::new("m")
            .property(PropertyDef::new("flag", AbstractType::Boolean))
            .property(PropertyDef::new("at", AbstractType::Timestamp));
        let actual = vec![
            column("flag", "char", Some(1), true),
            column("at", "TIMESTAMP(3)", Some(11), true),
        ];
        let ops = with_differ(&[], |d| d.compute_column_ops(&model, &actual));
        assert!(ops.is_empty(), "{ops:?}");
    }

    #[test]
    fn test_add_drop_and_soft_delete() {
        let model = customer()
            .property(PropertyDef::new("email", AbstractType::String).not_null())
            .property(PropertyDef::new("legacy", AbstractType::String).deleted());
        let actual = vec![
            column("id", "NUMBER", Some(22), false),
            column("name", "VARCHAR2", Some(50), true),
            column("obsolete", "NUMBER", Some(22), true),
        ];
        let ops = with_differ(&[], |d| d.compute_column_ops(&model, &actual));

        assert_eq!(ops.add, vec!["\"email\" VARCHAR2(1024) NOT NULL"]);
        assert!(ops.modify.is_empty());
        assert_eq!(ops.drop, vec!["\"obsolete\""]);
    }

    #[test]
    fn test_column_sets_are_disjoint() {
        let model = customer()
            .property(PropertyDef::new("a", AbstractType::Number))
            .property(PropertyDef::new("b", AbstractType::Date));
        let actual = vec![
            column("id", "NUMBER", Some(22), false),
            column("name", "VARCHAR2", Some(20), true),
            column("b", "DATE", Some(7), false),
            column("c", "NUMBER", Some(22), true),
        ];
        let ops = with_differ(&[], |d| d.compute_column_ops(&model, &actual));

        let touched: Vec<&str> = ops
            .add
            .iter()
            .chain(&ops.modify)
            .chain(&ops.drop)
            .map(|s| s.split('"').nth(1).unwrap())
            .collect();
        let unique: HashSet<&str> = touched.iter().copied().collect();
        assert_eq!(touched.len(), unique.len());
        assert_eq!(unique, HashSet::from(["a", "name", "b", "c"]));
    }

    #[test]
    fn test_primary_key_column_never_dropped() {
        let model = ModelDefinition::new("m")
            .property(PropertyDef::new("key", AbstractType::Number).primary_key().column("ID"));
        let actual = vec![column("ID", "VARCHAR2", Some(10), true)];
        let ops = with_differ(&[], |d| d.compute_column_ops(&model, &actual));
        assert!(ops.is_empty());
    }

    #[test]
    fn test_group_indexes_orders_by_position() {
        let rows = vec![
            CatalogIndexRow::new("idx_t_a_b", "t", false, "b", 2),
            CatalogIndexRow::new("SYS_C001", "t", true, "id", 1),
            CatalogIndexRow::new("idx_t_a_b", "t", false, "a", 1),
        ];
        let grouped = group_indexes(&rows);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].name, "idx_t_a_b");
        assert_eq!(grouped[0].columns, vec!["a", "b"]);
        assert!(grouped[1].unique);
    }

    #[test]
    fn test_model_index_name() {
        let model = customer();
        assert_eq!(Differ::model_index_name(&model, "idx_t_a_b"), "idx_a_b");
        assert_eq!(Differ::model_index_name(&model, "t_name"), "name");
        assert_eq!(Differ::model_index_name(&model, "other"), "other");
    }

    #[test]
    fn test_index_order_mismatch_recreates() {
        let model = customer().index("idx_a_b", IndexDef::columns("b,a"));
        let actual = vec![index("idx_t_a_b", &["a", "b"])];
        let ops = with_differ(&[], |d| d.compute_index_ops(&model, &actual));

        assert_eq!(
            ops,
            vec![
                DiffOperation::DropIndex {
                    name: "idx_t_a_b".to_string()
                },
                DiffOperation::AddIndex {
                    name: "idx_t_b_a".to_string(),
                    columns: vec!["b".to_string(), "a".to_string()],
                    unique: false,
                },
            ]
        );
    }

    #[test]
    fn test_matching_index_is_kept() {
        let model = customer().index("idx_a_b", IndexDef::keys([("a", 1), ("b", -1)]));
        let actual = vec![index("idx_t_a_b", &["a", "b"])];
        let ops = with_differ(&[], |d| d.compute_index_ops(&model, &actual));
        assert!(ops.is_empty(), "{ops:?}");
    }

    #[test]
    fn test_created_index_matches_on_next_run() {
        let model = customer().index("by_name", IndexDef::columns("name").unique());
        let first = with_differ(&[], |d| d.compute_index_ops(&model, &[]));
        assert_eq!(
            first,
            vec![DiffOperation::AddIndex {
                name: "idx_t_name".to_string(),
                columns: vec!["name".to_string()],
                unique: true,
            }]
        );

        let actual = vec![index("idx_t_name", &["name"])];
        let second = with_differ(&[], |d| d.compute_index_ops(&model, &actual));
        assert!(second.is_empty(), "{second:?}");
    }

    #[test]
    fn test_system_index_never_dropped() {
        let model = customer();
        let actual = vec![index("SYS_C0099", &["id", "name"])];
        let ops = with_differ(&[], |d| d.compute_index_ops(&model, &actual));
        assert!(ops.is_empty());
    }

    #[test]
    fn test_property_index_rules() {
        let model = customer()
            .property(
                PropertyDef::new("email", AbstractType::String).index(PropertyIndex::Flag(true)),
            )
            .property(
                PropertyDef::new("code", AbstractType::String).index(PropertyIndex::Flag(false)),
            );
        let actual = vec![
            index("t_email", &["email"]),
            index("t_code", &["code"]),
            index("t_stray", &["name"]),
        ];
        let ops = with_differ(&[], |d| d.compute_index_ops(&model, &actual));
        assert_eq!(
            ops,
            vec![
                DiffOperation::DropIndex {
                    name: "t_code".to_string()
                },
                DiffOperation::DropIndex {
                    name: "t_stray".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_foreign_key_target_column_change_drops() {
        let account = ModelDefinition::new("Account")
            .table("ACCOUNT")
            .property(PropertyDef::new("uid", AbstractType::Number).primary_key());
        let model = customer()
            .property(PropertyDef::new("accountId", AbstractType::Number))
            .foreign_key(ForeignKeyDef::new("fk_acct", "accountId", "Account", "uid"));
        let mut actual = vec![
            ActualForeignKey::new("fk_acct", "accountId", "ACCOUNT", "id"),
            ActualForeignKey::new("fk_gone", "name", "OTHER", "id"),
        ];

        let drops = with_differ(&[account], |d| {
            d.compute_foreign_key_drops(&model, &mut actual)
        });
        assert_eq!(
            drops,
            vec![
                DiffOperation::DropForeignKey("fk_acct".to_string()),
                DiffOperation::DropForeignKey("fk_gone".to_string()),
            ]
        );
        assert!(actual.is_empty());
    }

    #[test]
    fn test_foreign_key_unchanged_kept() {
        let account = ModelDefinition::new("Account")
            .table("ACCOUNT")
            .property(PropertyDef::new("id", AbstractType::Number).primary_key());
        let model = customer()
            .property(PropertyDef::new("accountId", AbstractType::Number))
            .foreign_key(ForeignKeyDef::new("fk_acct", "accountId", "Account", "id"));
        let mut actual = vec![ActualForeignKey::new("fk_acct", "accountId", "ACCOUNT", "id")];

        let (drops, adds) = with_differ(&[account], |d| {
            let drops = d.compute_foreign_key_drops(&model, &mut actual);
            (drops, d.compute_foreign_key_adds(&model, &actual))
        });
        assert!(drops.is_empty());
        assert!(adds.is_empty());
        assert_eq!(actual.len(), 1);
    }

    #[test]
    fn test_foreign_key_adds_skip_unknown_target() {
        let model = customer()
            .property(PropertyDef::new("accountId", AbstractType::Number))
            .foreign_key(ForeignKeyDef::new("fk_acct", "accountId", "Account", "id"));
        let adds = with_differ(&[], |d| d.compute_foreign_key_adds(&model, &[]));
        assert!(adds.is_empty());
    }

    #[test]
    fn test_diff_table_statements() {
        let model = ModelDefinition::new("Customer")
            .table("t")
            .property(PropertyDef::new("id", AbstractType::Number).primary_key())
            .property(PropertyDef::new("name", AbstractType::String).length(50).not_null())
            .index("idx_name", IndexDef::columns("name"));
        let columns = vec![
            column("id", "NUMBER", Some(22), false),
            column("name", "VARCHAR2", Some(50), true),
        ];
        let mut fks = vec![ActualForeignKey::new("fk_old", "name", "X", "id")];

        let (diff, statements) = with_differ(&[], |d| {
            let diff = d.diff_table(&model, &columns, &[], &mut fks);
            let statements = diff.statements(d.dialect, &model);
            (diff, statements)
        });

        assert!(!diff.is_empty());
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE \"t\" MODIFY (\"name\" NOT NULL) DROP CONSTRAINT \"fk_old\"".to_string(),
                "BEGIN\n  EXECUTE IMMEDIATE 'CREATE INDEX \"idx_t_name\" ON \"t\" (\"name\")';\nEND;"
                    .to_string(),
            ]
        );
    }
}
