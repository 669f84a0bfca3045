//! Value marshaling between JSON property values and Oracle binds.
//!
//! Dates travel as UTC strings through `to_timestamp_tz`, booleans as
//! `1`/`0` in their `CHAR(1)` column.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::connection::{DbError, codes};
use crate::error::{MigrateError, Result};
use crate::schema::{AbstractType, PropertyDef};
use crate::statement::{SqlValue, Statement};

fn invalid(property: &PropertyDef, message: impl Into<String>) -> MigrateError {
    MigrateError::InvalidValue {
        property: property.name.clone(),
        message: message.into(),
    }
}

fn parse_datetime(property: &PropertyDef, value: &Value) -> Result<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| Utc.from_utc_datetime(&dt))
                .ok_or_else(|| invalid(property, format!("'{s}' is not a date")))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| invalid(property, format!("{n} is not a timestamp"))),
        other => Err(invalid(property, format!("{other} is not a date"))),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Converts a property value to a SQL fragment with `?` binds.
///
/// A null key becomes `DEFAULT` so the key trigger fills it in.
pub fn to_column_value(property: &PropertyDef, value: &Value) -> Result<Statement> {
    if value.is_null() {
        if property.primary_key || property.generated {
            return Ok(Statement::new("DEFAULT"));
        }
        return Ok(Statement::new("?").bind(SqlValue::Null));
    }

    let fragment = match property.abstract_type {
        AbstractType::String | AbstractType::Text => match value {
            Value::String(s) => Statement::new("?").bind(s.as_str()),
            other => Statement::new("?").bind(other.to_string()),
        },
        AbstractType::Number => match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Statement::new("?").bind(i),
                None => Statement::new("?").bind(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => {
                let n: f64 = s
                    .trim()
                    .parse()
                    .map_err(|_| invalid(property, format!("'{s}' is not a number")))?;
                Statement::new("?").bind(n)
            }
            other => return Err(invalid(property, format!("{other} is not a number"))),
        },
        AbstractType::Date => {
            let dt = parse_datetime(property, value)?;
            Statement::new("to_timestamp_tz(?, 'yyyy-mm-dd hh24:mi:ss TZR')")
                .bind(dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        }
        AbstractType::Timestamp => {
            let dt = parse_datetime(property, value)?;
            Statement::new("to_timestamp_tz(?, 'yyyy-mm-dd hh24:mi:ss.ff3 TZR')")
                .bind(dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        }
        AbstractType::Boolean => Statement::new("?").bind(i64::from(truthy(value))),
        AbstractType::Json => Statement::new("?").bind(serde_json::to_string(value)?),
    };
    Ok(fragment)
}

/// Converts a column value read back from Oracle.
#[must_use]
pub fn from_column_value(property: &PropertyDef, value: Value) -> Value {
    match (property.abstract_type, value) {
        (AbstractType::Boolean, Value::Number(n)) => Value::Bool(n.as_i64() == Some(1)),
        (_, value) => value,
    }
}

/// Translates an insert failure, marking unique-key violations as
/// duplicate ids.
#[must_use]
pub fn translate_insert_error(error: DbError) -> MigrateError {
    if error.is(codes::UNIQUE_VIOLATION) {
        MigrateError::DuplicateId(format!("{error}. Duplicate id detected."))
    } else {
        MigrateError::Database(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_key_is_default() {
        let id = PropertyDef::new("id", AbstractType::Number).primary_key();
        assert_eq!(to_column_value(&id, &Value::Null).unwrap().sql, "DEFAULT");

        let name = PropertyDef::new("name", AbstractType::String);
        let stmt = to_column_value(&name, &Value::Null).unwrap();
        assert_eq!(stmt.params, vec![SqlValue::Null]);
    }

    #[test]
    fn test_timestamp_in_utc_with_millis() {
        let prop = PropertyDef::new("at", AbstractType::Timestamp);
        let stmt = to_column_value(&prop, &json!("2024-03-05T10:20:30.045+02:00")).unwrap();
        assert_eq!(stmt.sql, "to_timestamp_tz(?, 'yyyy-mm-dd hh24:mi:ss.ff3 TZR')");
        assert_eq!(stmt.params, vec![SqlValue::from("2024-03-05 08:20:30.045 UTC")]);
    }

    #[test]
    fn test_date_without_millis() {
        let prop = PropertyDef::new("day", AbstractType::Date);
        let stmt = to_column_value(&prop, &json!("2024-03-05")).unwrap();
        assert_eq!(stmt.params, vec![SqlValue::from("2024-03-05 00:00:00 UTC")]);

        let stmt = to_column_value(&prop, &json!(0)).unwrap();
        assert_eq!(stmt.params, vec![SqlValue::from("1970-01-01 00:00:00 UTC")]);
    }

    #[test]
    fn test_invalid_date() {
        let prop = PropertyDef::new("day", AbstractType::Date);
        let err = to_column_value(&prop, &json!("yesterday")).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidValue { .. }));
    }

    #[test]
    fn test_boolean_round_trip() {
        let prop = PropertyDef::new("active", AbstractType::Boolean);
        let stmt = to_column_value(&prop, &json!(true)).unwrap();
        assert_eq!(stmt.params, vec![SqlValue::Integer(1)]);
        let stmt = to_column_value(&prop, &json!(false)).unwrap();
        assert_eq!(stmt.params, vec![SqlValue::Integer(0)]);

        assert_eq!(from_column_value(&prop, json!(1)), json!(true));
        assert_eq!(from_column_value(&prop, json!(0)), json!(false));
        assert_eq!(from_column_value(&prop, Value::Null), Value::Null);
    }

    #[test]
    fn test_json_serialized() {
        let prop = PropertyDef::new("doc", AbstractType::Json);
        let stmt = to_column_value(&prop, &json!({ "a": 1 })).unwrap();
        assert_eq!(stmt.params, vec![SqlValue::from("{\"a\":1}")]);
    }

    #[test]
    fn test_duplicate_id_translation() {
        let err = translate_insert_error(DbError::new(
            "ORA-00001: unique constraint (APP.SYS_C0012) violated",
        ));
        assert!(
            matches!(err, MigrateError::DuplicateId(ref m) if m.ends_with("Duplicate id detected."))
        );

        let err = translate_insert_error(DbError::new("ORA-01400: cannot insert NULL"));
        assert!(matches!(err, MigrateError::Database(_)));
    }
}
