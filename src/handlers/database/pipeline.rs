//! Record coercion pipeline
//!
//! Strips the `table` pseudo-field, resolves type hints, cleans every field
//! and, on the literal path, escapes the cleaned text exactly once.

use super::coercion;
use super::escape::Escaper;
use super::types::{FieldValue, Record, Value};
use crate::error::{Error, Result};

/// Record after cleaning: routing table plus typed column values
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    table: Option<String>,
    columns: Vec<(String, Value)>,
}

impl CleanRecord {
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn require_table(&self) -> Result<&str> {
        self.table()
            .ok_or_else(|| Error::Configuration("Record has no `table` field".to_string()))
    }

    pub fn columns(&self) -> &[(String, Value)] {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Record after cleaning and escaping, ready for literal embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapedRecord {
    table: Option<String>,
    columns: Vec<(String, String)>,
}

impl EscapedRecord {
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

/// Clean every data field of `record`.
///
/// Any cleaning failure fails the whole record.
pub fn coerce(mut record: Record) -> Result<CleanRecord> {
    let table = record.take_table();
    let (fields, hints) = record.into_parts();
    let hints = coercion::resolve_hints(fields.len(), &hints)?;

    let columns = fields
        .into_iter()
        .zip(hints)
        .map(|(field, hint)| -> Result<(String, Value)> {
            let value = match field.value {
                FieldValue::Typed(value) => value,
                FieldValue::Raw(raw) => {
                    let hint = hint.unwrap_or_else(|| coercion::infer_hint(&field.name, &raw));
                    coercion::clean(&raw, hint)?
                }
            };
            Ok((field.name, value))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CleanRecord { table, columns })
}

/// Clean, then escape every data field with `escaper`.
pub fn escape_record(record: Record, escaper: &dyn Escaper) -> Result<EscapedRecord> {
    let clean = coerce(record)?;
    let columns = clean
        .columns
        .into_iter()
        .map(|(name, value)| -> Result<(String, String)> {
            Ok((name, escaper.escape(&value.to_sql_text())?))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(EscapedRecord {
        table: clean.table,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    #[cfg(feature = "mysql-backend")]
    use crate::handlers::database::{escape::SessionEscaper, types::SessionInfo};
    use crate::handlers::database::types::TypeHint;

    #[test]
    fn test_table_never_reaches_output() {
        let clean = coerce(Record::table("names").field("lname", "Zouhir").field("age", 25))
            .unwrap();
        assert_eq!(clean.table(), Some("names"));
        assert!(clean.get("table").is_none());
        assert_eq!(clean.get("age"), Some(&Value::Integer(25)));
        assert_eq!(clean.get("lname"), Some(&Value::Text("Zouhir".to_string())));
    }

    #[test]
    fn test_hints_align_after_table_removal() {
        let record = Record::table("events")
            .field("starts", " 2014-01-01 12:30:30 ")
            .field("color", "bg #00ff00")
            .with_hints(vec![TypeHint::DateTime, TypeHint::HexColor]);
        let clean = coerce(record).unwrap();
        assert_eq!(
            clean.columns(),
            &[
                (
                    "starts".to_string(),
                    Value::DateTime("2014-01-01 12:30:30".to_string())
                ),
                ("color".to_string(), Value::HexColor("#00ff00".to_string())),
            ]
        );
    }

    #[test]
    fn test_overflowing_float_fails_record() {
        let record = Record::table("readings")
            .field("label", "sensor")
            .field("value", "1e400");
        assert!(matches!(
            coerce(record),
            Err(Error::Format(FormatError::NonFinite { .. }))
        ));
    }

    #[test]
    fn test_format_error_fails_whole_record() {
        let record = Record::table("events")
            .field("title", "launch")
            .field("starts", "soon")
            .with_hints(vec![TypeHint::String, TypeHint::DateTime]);
        assert!(matches!(coerce(record), Err(Error::Format(_))));
    }

    #[test]
    fn test_typed_fields_skip_cleaning() {
        let record = Record::table("users")
            .typed("code", Value::Text("123@45".to_string()))
            .field("age", "30");
        let clean = coerce(record).unwrap();
        assert_eq!(clean.get("code"), Some(&Value::Text("123@45".to_string())));
        assert_eq!(clean.get("age"), Some(&Value::Integer(30)));
    }

    #[cfg(feature = "mysql-backend")]
    #[test]
    fn test_escape_record() {
        let escaper = SessionEscaper::for_session(&SessionInfo::default()).unwrap();
        let escaped = escape_record(
            Record::table("names").field("lname", "O'Brien").field("active", true),
            &escaper,
        )
        .unwrap();
        assert_eq!(escaped.table(), Some("names"));
        assert_eq!(escaped.get("lname"), Some("O\\'Brien"));
        assert_eq!(escaped.get("active"), Some("1"));
    }
}
