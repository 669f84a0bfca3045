//! Type mapping between abstract property types and Oracle column types.

use std::sync::LazyLock;

use regex::Regex;

use super::OracleDialect;
use crate::schema::{AbstractType, ColumnMetadata, PropertyDef};

/// Length used for character columns that declare none.
pub const DEFAULT_VARCHAR_LENGTH: u32 = 1024;

static LENGTH_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]*\([0-9]*\)$").expect("static pattern is valid"));

impl OracleDialect {
    /// Returns the Oracle column type for a property.
    ///
    /// A catalog type pinned on the property wins over its abstract type.
    #[must_use]
    pub fn column_type(&self, property: &PropertyDef) -> String {
        self.map_type(
            property.abstract_type,
            property.length,
            property.metadata.as_ref(),
        )
    }

    /// Maps an abstract type and length to an Oracle type.
    #[must_use]
    pub fn map_type(
        &self,
        abstract_type: AbstractType,
        length: Option<u32>,
        metadata: Option<&ColumnMetadata>,
    ) -> String {
        let pinned = metadata.and_then(|m| m.data_type.as_deref());
        let length = metadata.and_then(|m| m.data_length).or(length);

        if let Some(data_type) = pinned {
            let data_type = data_type.to_uppercase();
            return match length {
                Some(len) => format!("{data_type}({len})"),
                None => data_type,
            };
        }

        match abstract_type {
            AbstractType::String | AbstractType::Json | AbstractType::Text => {
                format!("VARCHAR2({})", length.unwrap_or(DEFAULT_VARCHAR_LENGTH))
            }
            AbstractType::Number => "NUMBER".to_string(),
            AbstractType::Date => "DATE".to_string(),
            AbstractType::Timestamp => "TIMESTAMP(3)".to_string(),
            // Oracle has no boolean column type.
            AbstractType::Boolean => "CHAR(1)".to_string(),
        }
    }

    /// Returns the column type plus `NOT NULL` when the property requires it.
    #[must_use]
    pub fn column_definition(&self, property: &PropertyDef) -> String {
        let column_type = self.column_type(property);
        if property.nullable {
            column_type
        } else {
            format!("{column_type} NOT NULL")
        }
    }

    /// Normalizes a catalog type name through the synonym table.
    #[must_use]
    pub fn normalize_live_type(&self, raw: &str) -> String {
        match raw.to_ascii_lowercase().as_str() {
            "int4" | "int8" | "int" | "integer" => "NUMBER".to_string(),
            "bool" | "boolean" => "CHAR(1)".to_string(),
            _ => raw.to_string(),
        }
    }
}

/// Returns true if a type string ends in a plain `(length)` suffix, e.g.
/// `VARCHAR2(50)`.
#[must_use]
pub fn has_length_suffix(column_type: &str) -> bool {
    LENGTH_SUFFIX.is_match(column_type)
}

/// Rebuilds the type string of a live column so it compares against
/// [`OracleDialect::column_type`].
///
/// The catalog length is appended only when the declared type carries a
/// length suffix and the catalog type does not already have one.
#[must_use]
pub fn actual_type(db_type: &str, length: Option<u32>, declared: &str) -> String {
    let db_type = db_type.to_uppercase();
    match length {
        Some(len) if has_length_suffix(declared) && !db_type.contains('(') => {
            format!("{db_type}({len})")
        }
        _ => db_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect() -> OracleDialect {
        OracleDialect::new()
    }

    #[test]
    fn test_abstract_types() {
        let d = dialect();
        assert_eq!(
            d.column_type(&PropertyDef::new("a", AbstractType::String)),
            "VARCHAR2(1024)"
        );
        assert_eq!(
            d.column_type(&PropertyDef::new("a", AbstractType::Json).length(4000)),
            "VARCHAR2(4000)"
        );
        assert_eq!(d.column_type(&PropertyDef::new("a", AbstractType::Number)), "NUMBER");
        assert_eq!(d.column_type(&PropertyDef::new("a", AbstractType::Date)), "DATE");
        assert_eq!(
            d.column_type(&PropertyDef::new("a", AbstractType::Timestamp)),
            "TIMESTAMP(3)"
        );
        assert_eq!(d.column_type(&PropertyDef::new("a", AbstractType::Boolean)), "CHAR(1)");
    }

    #[test]
    fn test_pinned_metadata_wins() {
        let prop = PropertyDef::new("a", AbstractType::String).metadata("nvarchar2", Some(20));
        assert_eq!(dialect().column_type(&prop), "NVARCHAR2(20)");

        let prop = PropertyDef::new("a", AbstractType::Number).metadata("float", None);
        assert_eq!(dialect().column_type(&prop), "FLOAT");

        let prop = PropertyDef::new("a", AbstractType::String)
            .length(30)
            .metadata("CHAR", None);
        assert_eq!(dialect().column_type(&prop), "CHAR(30)");
    }

    #[test]
    fn test_column_definition() {
        let prop = PropertyDef::new("a", AbstractType::String).length(50).not_null();
        assert_eq!(dialect().column_definition(&prop), "VARCHAR2(50) NOT NULL");
    }

    #[test]
    fn test_normalize_live_type() {
        let d = dialect();
        assert_eq!(d.normalize_live_type("int4"), "NUMBER");
        assert_eq!(d.normalize_live_type("bool"), "CHAR(1)");
        assert_eq!(d.normalize_live_type("VARCHAR2"), "VARCHAR2");
        assert_eq!(d.normalize_live_type("TIMESTAMP(3)"), "TIMESTAMP(3)");
    }

    #[test]
    fn test_length_suffix() {
        assert!(has_length_suffix("VARCHAR2(50)"));
        assert!(has_length_suffix("TIMESTAMP(3)"));
        assert!(!has_length_suffix("NUMBER"));
        assert!(!has_length_suffix("NUMBER(10,2)"));
    }

    #[test]
    fn test_actual_type() {
        assert_eq!(actual_type("VARCHAR2", Some(50), "VARCHAR2(50)"), "VARCHAR2(50)");
        assert_eq!(actual_type("NUMBER", Some(22), "NUMBER"), "NUMBER");
        assert_eq!(actual_type("TIMESTAMP(3)", Some(11), "TIMESTAMP(3)"), "TIMESTAMP(3)");
        assert_eq!(actual_type("char", Some(1), "CHAR(1)"), "CHAR(1)");
    }
}
