//! DDL rendering.
//!
//! Oracle refuses `CREATE INDEX`/`DROP INDEX` inside a batched ALTER, so
//! index statements are issued through `EXECUTE IMMEDIATE` in one anonymous
//! block.

use super::OracleDialect;
use crate::schema::{ForeignKeyDef, IndexDef, ModelDefinition};
use crate::statement::quote_literal;

/// One index statement inside an index block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatement {
    /// `CREATE [UNIQUE] INDEX`.
    Create {
        /// Physical index name.
        name: String,
        /// Column names in order.
        columns: Vec<String>,
        /// Whether the index is unique.
        unique: bool,
    },
    /// `DROP INDEX`.
    Drop {
        /// Physical index name.
        name: String,
    },
}

impl OracleDialect {
    /// Renders `CREATE TABLE` with an inline primary key clause.
    ///
    /// Soft-deleted properties are left out.
    #[must_use]
    pub fn create_table_sql(&self, model: &ModelDefinition) -> String {
        let mut lines: Vec<String> = model
            .properties
            .iter()
            .filter(|p| !p.deleted)
            .map(|p| {
                format!(
                    "{} {}",
                    self.escape_name(p.column_name()),
                    self.column_definition(p)
                )
            })
            .collect();

        let pks: Vec<String> = model
            .id_properties()
            .map(|p| self.escape_name(p.column_name()))
            .collect();
        if !pks.is_empty() {
            lines.push(format!("PRIMARY KEY({})", pks.join(", ")));
        }

        format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.table_escaped(model),
            lines.join(",\n  ")
        )
    }

    /// Renders the key sequence.
    #[must_use]
    pub fn create_sequence_sql(&self, model: &ModelDefinition) -> String {
        format!(
            "CREATE SEQUENCE {} START WITH 1 INCREMENT BY 1 CACHE 100",
            self.escape_name(&self.sequence_name(model.table_name()))
        )
    }

    /// Renders the trigger filling a null key from the sequence.
    ///
    /// Returns `None` when the model has no primary key.
    #[must_use]
    pub fn create_trigger_sql(&self, model: &ModelDefinition) -> Option<String> {
        let id = self.escape_name(model.id_column()?);
        let table = model.table_name();
        Some(format!(
            "CREATE OR REPLACE TRIGGER {trigger} BEFORE INSERT ON {name} FOR EACH ROW\n\
             WHEN (new.{id} IS NULL)\n\
             BEGIN\n  SELECT {sequence}.NEXTVAL INTO :new.{id} FROM dual;\nEND;",
            trigger = self.escape_name(&self.trigger_name(table)),
            name = self.table_escaped(model),
            sequence = self.escape_name(&self.sequence_name(table)),
        ))
    }

    /// Returns the name an index is created under:
    /// `idx_<table>_<columns joined by underscores>`.
    #[must_use]
    pub fn generated_index_name(&self, model: &ModelDefinition, index: &IndexDef) -> String {
        let joined = index.column_names().join("_");
        let joined = joined.strip_suffix('_').unwrap_or(&joined);
        format!("idx_{}_{}", model.table_name(), joined)
    }

    /// Returns a `CREATE INDEX` statement for a declared index.
    #[must_use]
    pub fn create_index_statement(
        &self,
        model: &ModelDefinition,
        index: &IndexDef,
    ) -> IndexStatement {
        IndexStatement::Create {
            name: self.generated_index_name(model, index),
            columns: index
                .column_names()
                .iter()
                .map(|c| model.column_for(c).to_string())
                .collect(),
            unique: index.is_unique(),
        }
    }

    /// Renders one index statement, without the dynamic-execute wrapper.
    #[must_use]
    pub fn index_sql(&self, model: &ModelDefinition, statement: &IndexStatement) -> String {
        match statement {
            IndexStatement::Create {
                name,
                columns,
                unique,
            } => {
                let columns: Vec<String> = columns.iter().map(|c| self.escape_name(c)).collect();
                format!(
                    "CREATE {}INDEX {} ON {} ({})",
                    if *unique { "UNIQUE " } else { "" },
                    self.escape_name(name),
                    self.table_escaped(model),
                    columns.join(", ")
                )
            }
            IndexStatement::Drop { name } => format!("DROP INDEX {}", self.escape_name(name)),
        }
    }

    /// Wraps index statements in one anonymous block.
    ///
    /// Returns `None` when there is nothing to run.
    #[must_use]
    pub fn index_block(
        &self,
        model: &ModelDefinition,
        statements: &[IndexStatement],
    ) -> Option<String> {
        if statements.is_empty() {
            return None;
        }
        let mut block = String::from("BEGIN\n");
        for statement in statements {
            block.push_str("  EXECUTE IMMEDIATE ");
            block.push_str(&quote_literal(&self.index_sql(model, statement)));
            block.push_str(";\n");
        }
        block.push_str("END;");
        Some(block)
    }

    /// Renders the block creating every declared index of a new table.
    #[must_use]
    pub fn create_indexes_sql(&self, model: &ModelDefinition) -> Option<String> {
        let statements: Vec<IndexStatement> = model
            .indexes
            .values()
            .filter(|index| !index.column_names().is_empty())
            .map(|index| self.create_index_statement(model, index))
            .collect();
        self.index_block(model, &statements)
    }

    /// Returns the ordered statements creating a table.
    ///
    /// A single generated key adds the sequence and trigger after the table.
    #[must_use]
    pub fn create_table_tasks(&self, model: &ModelDefinition) -> Vec<String> {
        let mut tasks = vec![self.create_table_sql(model)];
        if model.is_id_generated() {
            tasks.push(self.create_sequence_sql(model));
            if let Some(trigger) = self.create_trigger_sql(model) {
                tasks.push(trigger);
            }
        }
        if let Some(indexes) = self.create_indexes_sql(model) {
            tasks.push(indexes);
        }
        tasks
    }

    /// Renders one `ALTER TABLE` from clause groups.
    ///
    /// Returns `None` when every group is empty.
    #[must_use]
    pub fn alter_table_sql(&self, model: &ModelDefinition, clauses: &[String]) -> Option<String> {
        let clauses: Vec<&str> = clauses
            .iter()
            .map(String::as_str)
            .filter(|c| !c.trim().is_empty())
            .collect();
        if clauses.is_empty() {
            return None;
        }
        Some(format!(
            "ALTER TABLE {} {}",
            self.table_escaped(model),
            clauses.join(" ")
        ))
    }

    /// Renders `DROP TABLE`.
    #[must_use]
    pub fn drop_table_sql(&self, model: &ModelDefinition) -> String {
        format!("DROP TABLE {}", self.table_escaped(model))
    }

    /// Renders `DROP SEQUENCE` for the key sequence.
    #[must_use]
    pub fn drop_sequence_sql(&self, model: &ModelDefinition) -> String {
        format!(
            "DROP SEQUENCE {}",
            self.escape_name(&self.sequence_name(model.table_name()))
        )
    }

    /// Returns the ordered statements dropping a table. The trigger goes
    /// with the table.
    #[must_use]
    pub fn drop_table_tasks(&self, model: &ModelDefinition) -> Vec<String> {
        let mut tasks = vec![self.drop_table_sql(model)];
        if model.is_id_generated() {
            tasks.push(self.drop_sequence_sql(model));
        }
        tasks
    }

    /// Renders `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`.
    #[must_use]
    pub fn add_foreign_key_sql(
        &self,
        model: &ModelDefinition,
        fk: &ForeignKeyDef,
        target: &ModelDefinition,
    ) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
            self.table_escaped(model),
            self.escape_name(&fk.name),
            self.column_escaped(model, &fk.foreign_key),
            self.table_escaped(target),
            self.column_escaped(target, &fk.entity_key)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AbstractType, PropertyDef};

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

    #[test]
    fn test_create_table_sql() {
        let sql = OracleDialect::new().create_table_sql(&customer());
        assert_eq!(
            sql,
            "CREATE TABLE \"t\" (\n  \"id\" NUMBER,\n  \"name\" VARCHAR2(50),\n  PRIMARY KEY(\"id\")\n)"
        );
    }

    #[test]
    fn test_create_table_tasks_generated_key() {
        let tasks = OracleDialect::new().create_table_tasks(&customer());
        assert_eq!(tasks.len(), 3);
        assert!(tasks[0].starts_with("CREATE TABLE \"t\""));
        assert_eq!(
            tasks[1],
            "CREATE SEQUENCE \"t_id_sequence\" START WITH 1 INCREMENT BY 1 CACHE 100"
        );
        assert_eq!(
            tasks[2],
            "CREATE OR REPLACE TRIGGER \"t_id_trigger\" BEFORE INSERT ON \"t\" FOR EACH ROW\n\
             WHEN (new.\"id\" IS NULL)\n\
             BEGIN\n  SELECT \"t_id_sequence\".NEXTVAL INTO :new.\"id\" FROM dual;\nEND;"
        );
    }

    #[test]
    fn test_create_table_tasks_plain_key() {
        let model = ModelDefinition::new("Tag")
            .property(PropertyDef::new("code", AbstractType::String).primary_key())
            .index("idx_code_label", IndexDef::columns("code,label"));
        let tasks = OracleDialect::new().create_table_tasks(&model);
        assert_eq!(tasks.len(), 2);
        assert_eq!(
            tasks[1],
            "BEGIN\n  EXECUTE IMMEDIATE 'CREATE INDEX \"idx_Tag_code_label\" ON \"Tag\" (\"code\", \"label\")';\nEND;"
        );
    }

    #[test]
    fn test_index_block_empty() {
        assert!(OracleDialect::new().index_block(&customer(), &[]).is_none());
    }

    #[test]
    fn test_generated_index_name_trims_separator() {
        let dialect = OracleDialect::new();
        let index = IndexDef::columns("a, b,");
        assert_eq!(dialect.generated_index_name(&customer(), &index), "idx_t_a_b");
    }

    #[test]
    fn test_alter_table_sql() {
        let dialect = OracleDialect::new();
        assert!(dialect.alter_table_sql(&customer(), &[]).is_none());
        let sql = dialect.alter_table_sql(
            &customer(),
            &["ADD (\"x\" NUMBER)".to_string(), "DROP (\"y\")".to_string()],
        );
        assert_eq!(
            sql.as_deref(),
            Some("ALTER TABLE \"t\" ADD (\"x\" NUMBER) DROP (\"y\")")
        );
    }

    #[test]
    fn test_drop_table_tasks() {
        let tasks = OracleDialect::new().drop_table_tasks(&customer());
        assert_eq!(tasks, vec!["DROP TABLE \"t\"", "DROP SEQUENCE \"t_id_sequence\""]);
    }

    #[test]
    fn test_add_foreign_key_sql() {
        let order = ModelDefinition::new("Order")
            .property(PropertyDef::new("customerId", AbstractType::Number).column("CUSTOMER_ID"));
        let fk = ForeignKeyDef::new("fk_order_customer", "customerId", "Customer", "id");
        let sql = OracleDialect::new().add_foreign_key_sql(&order, &fk, &customer());
        assert_eq!(
            sql,
            "ALTER TABLE \"Order\" ADD CONSTRAINT \"fk_order_customer\" FOREIGN KEY (\"CUSTOMER_ID\") REFERENCES \"t\"(\"id\")"
        );
    }
}
