//! Model metadata.
//!
//! These types describe what a model declares: its properties, indexes and
//! foreign keys. They are owned by the ORM runtime and only read by the
//! auto-update engine. [`ModelRegistry`] is an in-memory implementation of
//! the [`ModelMetadata`] lookup, loadable from JSON.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Abstract property types understood by the type mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AbstractType {
    /// String (the fallback for unknown type names).
    #[default]
    String,
    /// JSON document stored as text.
    Json,
    /// Long text.
    Text,
    /// Any number.
    Number,
    /// Date.
    Date,
    /// Timestamp with milliseconds.
    Timestamp,
    /// Boolean.
    Boolean,
}

impl AbstractType {
    /// Returns the canonical type name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Json => "JSON",
            Self::Text => "Text",
            Self::Number => "Number",
            Self::Date => "Date",
            Self::Timestamp => "Timestamp",
            Self::Boolean => "Boolean",
        }
    }

    /// Parses a type name case-insensitively, falling back to `String`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "json" | "object" | "any" => Self::Json,
            "text" => Self::Text,
            "number" => Self::Number,
            "date" => Self::Date,
            "timestamp" => Self::Timestamp,
            "boolean" => Self::Boolean,
            _ => Self::String,
        }
    }
}

impl From<String> for AbstractType {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<AbstractType> for String {
    fn from(value: AbstractType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AbstractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog type pinned on a property, e.g. recorded by schema discovery.
///
/// When present, the type mapper uses it instead of the abstract type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    /// Catalog type name, e.g. `VARCHAR2`.
    #[serde(default)]
    pub data_type: Option<String>,
    /// Catalog length.
    #[serde(default)]
    pub data_length: Option<u32>,
}

/// Single-property index configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyIndex {
    /// `true` enables, `false` withdraws eligibility.
    Flag(bool),
    /// Enabled with options.
    Options {
        /// Whether the index is unique.
        #[serde(default)]
        unique: bool,
    },
}

impl PropertyIndex {
    /// Returns true if indexing was explicitly withdrawn.
    #[must_use]
    pub fn is_withdrawn(&self) -> bool {
        matches!(self, Self::Flag(false))
    }

    /// Returns true if the index is unique.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        matches!(self, Self::Options { unique: true })
    }
}

fn default_true() -> bool {
    true
}

/// Declared property of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Property name.
    pub name: String,
    /// Abstract type.
    #[serde(rename = "type", default)]
    pub abstract_type: AbstractType,
    /// Declared length (character types).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Whether the column allows NULL.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Whether this property is (part of) the primary key.
    #[serde(default, rename = "id")]
    pub primary_key: bool,
    /// Whether the key value is generated by the database.
    #[serde(default)]
    pub generated: bool,
    /// Soft-deleted properties are never added to the table.
    #[serde(default)]
    pub deleted: bool,
    /// Column name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Pinned catalog type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ColumnMetadata>,
    /// Single-property index configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<PropertyIndex>,
}

impl PropertyDef {
    /// Creates a nullable property.
    #[must_use]
    pub fn new(name: impl Into<String>, abstract_type: AbstractType) -> Self {
        Self {
            name: name.into(),
            abstract_type,
            length: None,
            nullable: true,
            primary_key: false,
            generated: false,
            deleted: false,
            column: None,
            metadata: None,
            index: None,
        }
    }

    /// Sets the declared length.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Marks the property NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the property as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the key as database-generated.
    #[must_use]
    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Marks the property as soft-deleted.
    #[must_use]
    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Overrides the column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Pins a catalog type.
    #[must_use]
    pub fn metadata(mut self, data_type: impl Into<String>, data_length: Option<u32>) -> Self {
        self.metadata = Some(ColumnMetadata {
            data_type: Some(data_type.into()),
            data_length,
        });
        self
    }

    /// Sets the single-property index configuration.
    #[must_use]
    pub fn index(mut self, index: PropertyIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Returns the column this property maps to.
    #[must_use]
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// Unique flag nested under `options`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexOptions {
    /// Whether the index is unique.
    #[serde(default)]
    pub unique: bool,
}

/// A declared (possibly multi-column) index.
///
/// Columns are given either as a comma-separated `columns` string or as an
/// ordered `keys` mapping of column to sort direction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexDef {
    /// Comma-separated column list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<String>,
    /// Ordered column -> direction mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<IndexMap<String, i32>>,
    /// Whether the index is unique.
    #[serde(default)]
    pub unique: bool,
    /// Alternative place for the unique flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<IndexOptions>,
}

impl IndexDef {
    /// Creates an index from a comma-separated column list.
    #[must_use]
    pub fn columns(columns: impl Into<String>) -> Self {
        Self {
            columns: Some(columns.into()),
            ..Self::default()
        }
    }

    /// Creates an index from ordered keys.
    #[must_use]
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        Self {
            keys: Some(keys.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            ..Self::default()
        }
    }

    /// Marks the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns true if either unique flag is set.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique || self.options.is_some_and(|o| o.unique)
    }

    /// Returns the declared column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        if let Some(keys) = &self.keys {
            return keys.keys().cloned().collect();
        }
        self.columns
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A declared foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDef {
    /// Constraint name (defaults to the key it is declared under).
    #[serde(default)]
    pub name: String,
    /// Local property.
    pub foreign_key: String,
    /// Referenced model.
    pub entity: String,
    /// Referenced property.
    pub entity_key: String,
}

impl ForeignKeyDef {
    /// Creates a foreign key definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        foreign_key: impl Into<String>,
        entity: impl Into<String>,
        entity_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            foreign_key: foreign_key.into(),
            entity: entity.into(),
            entity_key: entity_key.into(),
        }
    }
}

/// Declared shape of one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    /// Model name.
    pub name: String,
    /// Table name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Owning schema, when different from the connection user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Properties in declaration order.
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    /// Named indexes.
    #[serde(default)]
    pub indexes: IndexMap<String, IndexDef>,
    /// Named foreign keys.
    #[serde(default)]
    pub foreign_keys: IndexMap<String, ForeignKeyDef>,
}

impl ModelDefinition {
    /// Creates an empty model.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            schema: None,
            properties: Vec::new(),
            indexes: IndexMap::new(),
            foreign_keys: IndexMap::new(),
        }
    }

    /// Sets the table name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the owning schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Adds a property.
    #[must_use]
    pub fn property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    /// Adds a named index.
    #[must_use]
    pub fn index(mut self, name: impl Into<String>, index: IndexDef) -> Self {
        self.indexes.insert(name.into(), index);
        self
    }

    /// Adds a foreign key, keyed by its constraint name.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.insert(fk.name.clone(), fk);
        self
    }

    /// Returns the table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    /// Gets a property by name.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Returns the column for a property name, or the name itself when the
    /// model has no such property.
    #[must_use]
    pub fn column_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.get_property(name)
            .map_or(name, PropertyDef::column_name)
    }

    /// Resolves a column back to the property that maps to it.
    #[must_use]
    pub fn property_for_column(&self, column: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.column_name() == column)
    }

    /// Returns the primary key properties.
    pub fn id_properties(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties.iter().filter(|p| p.primary_key)
    }

    /// Returns the first primary key column.
    #[must_use]
    pub fn id_column(&self) -> Option<&str> {
        self.id_properties().next().map(PropertyDef::column_name)
    }

    /// Returns true if the primary key is a single generated column.
    #[must_use]
    pub fn is_id_generated(&self) -> bool {
        let mut ids = self.id_properties();
        match (ids.next(), ids.next()) {
            (Some(id), None) => id.generated,
            _ => false,
        }
    }

    /// Fills in defaults and checks internal consistency.
    pub fn normalize(&mut self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for property in &self.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(MigrateError::InvalidModel(format!(
                    "model '{}' declares property '{}' twice",
                    self.name, property.name
                )));
            }
        }
        for (key, fk) in &mut self.foreign_keys {
            if fk.name.is_empty() {
                fk.name.clone_from(key);
            }
        }
        Ok(())
    }
}

/// Model metadata lookup consumed by the auto-update engine.
pub trait ModelMetadata: Send + Sync {
    /// Gets a model by name.
    fn get_model(&self, name: &str) -> Option<&ModelDefinition>;

    /// Returns all registered model names, in registration order.
    fn model_names(&self) -> Vec<String>;

    /// Returns true if the model's primary key is generated.
    fn is_id_generated(&self, name: &str) -> bool {
        self.get_model(name)
            .is_some_and(ModelDefinition::is_id_generated)
    }

    /// Returns the model's primary key column.
    fn id_column_name(&self, name: &str) -> Option<String> {
        self.get_model(name)
            .and_then(ModelDefinition::id_column)
            .map(str::to_string)
    }
}

/// In-memory model registry.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelDefinition>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model, replacing any model with the same name.
    pub fn register(&mut self, mut model: ModelDefinition) -> Result<()> {
        model.normalize()?;
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_model(mut self, model: ModelDefinition) -> Result<Self> {
        self.register(model)?;
        Ok(self)
    }

    /// Loads a JSON array of model definitions.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let models: Vec<ModelDefinition> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for model in models {
            registry.register(model)?;
        }
        Ok(registry)
    }

    /// Loads model definitions from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| MigrateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Returns the number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true if no models are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl ModelMetadata for ModelRegistry {
    fn get_model(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.get(name)
    }

    fn model_names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }
}
