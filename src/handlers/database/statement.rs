//! SQL statement construction
//!
//! Builds CRUD statements with backtick-quoted identifiers and positional `?`
//! placeholders. Column values are never interpolated into the SQL text; they
//! travel alongside it as bound parameters.

use super::types::{Operator, Value};
use crate::error::{Error, Result};

/// SQL text plus the values bound to its placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    sql: String,
    params: Vec<Value>,
}

impl SqlStatement {
    /// Statement without parameters
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }

    /// `SELECT * FROM t [WHERE a = ? op b = ?]`
    pub fn select(
        table: &str,
        conditions: &[(String, Value)],
        operator: Operator,
    ) -> Result<Self> {
        let mut sql = format!("SELECT * FROM {}", quote_identifier(table)?);
        let (clause, params) = where_clause(conditions, operator)?;
        sql.push_str(&clause);
        Ok(Self::with_params(sql, params))
    }

    /// `INSERT INTO t (a, b) VALUES (?, ?)`
    pub fn insert(table: &str, columns: &[(String, Value)]) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::Validation(format!(
                "Nothing to insert into {}",
                table
            )));
        }

        let names = columns
            .iter()
            .map(|(name, _)| quote_identifier(name))
            .collect::<Result<Vec<_>>>()?;
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table)?,
            names.join(", "),
            placeholders
        );
        let params = columns.iter().map(|(_, value)| value.clone()).collect();
        Ok(Self::with_params(sql, params))
    }

    /// `UPDATE t SET a = ?, b = ? WHERE k = ? AND ...`
    pub fn update(
        table: &str,
        columns: &[(String, Value)],
        conditions: &[(String, Value)],
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::Validation(format!("Nothing to update in {}", table)));
        }
        if conditions.is_empty() {
            return Err(Error::Validation(format!(
                "Update of {} requires at least one condition",
                table
            )));
        }

        let assignments = columns
            .iter()
            .map(|(name, _)| -> Result<String> {
                Ok(format!("{} = ?", quote_identifier(name)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut sql = format!(
            "UPDATE {} SET {}",
            quote_identifier(table)?,
            assignments.join(", ")
        );
        let (clause, condition_params) = where_clause(conditions, Operator::And)?;
        sql.push_str(&clause);

        let mut params: Vec<Value> = columns.iter().map(|(_, value)| value.clone()).collect();
        params.extend(condition_params);
        Ok(Self::with_params(sql, params))
    }

    /// `DELETE FROM t [WHERE k = ? AND ...]`
    pub fn delete(table: &str, conditions: &[(String, Value)]) -> Result<Self> {
        let mut sql = format!("DELETE FROM {}", quote_identifier(table)?);
        let (clause, params) = where_clause(conditions, Operator::And)?;
        sql.push_str(&clause);
        Ok(Self::with_params(sql, params))
    }

    /// Placeholders outside quoted identifiers and string literals
    pub fn placeholder_count(&self) -> usize {
        let mut count = 0;
        let mut quote: Option<char> = None;
        let mut chars = self.sql.chars().peekable();

        while let Some(ch) = chars.next() {
            match quote {
                Some(q) if ch == q => {
                    // doubled quote stays inside the literal
                    if chars.peek() == Some(&q) {
                        chars.next();
                    } else {
                        quote = None;
                    }
                }
                Some(q) if ch == '\\' && q != '`' => {
                    chars.next();
                }
                Some(_) => {}
                None => match ch {
                    '\'' | '"' | '`' => quote = Some(ch),
                    '?' => count += 1,
                    _ => {}
                },
            }
        }
        count
    }

    /// Validate parameter count against query placeholders
    pub fn validate_param_count(&self) -> Result<()> {
        let expected = self.placeholder_count();
        if expected != self.params.len() {
            return Err(Error::Validation(format!(
                "Parameter count mismatch: expected {}, provided {}",
                expected,
                self.params.len()
            )));
        }
        Ok(())
    }

    /// Parameter types for logging, without exposing values
    pub fn param_summary(&self) -> String {
        self.params
            .iter()
            .enumerate()
            .map(|(i, param)| format!("${}: {}", i + 1, param.type_name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Null conditions use `<=>` so they match NULL columns
fn where_clause(
    conditions: &[(String, Value)],
    operator: Operator,
) -> Result<(String, Vec<Value>)> {
    if conditions.is_empty() {
        return Ok((String::new(), Vec::new()));
    }

    let predicates = conditions
        .iter()
        .map(|(name, value)| -> Result<String> {
            let comparison = if value.is_null() { "<=>" } else { "=" };
            Ok(format!("{} {} ?", quote_identifier(name)?, comparison))
        })
        .collect::<Result<Vec<_>>>()?;
    let clause = format!(" WHERE {}", predicates.join(&format!(" {} ", operator)));
    let params = conditions.iter().map(|(_, value)| value.clone()).collect();
    Ok((clause, params))
}

/// Backtick-quote an identifier, doubling embedded backticks
pub fn quote_identifier(name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(Error::Validation("Empty identifier".to_string()));
    }
    if name.contains('\0') {
        return Err(Error::Validation(format!(
            "Identifier contains a NUL byte: {:?}",
            name
        )));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("name").unwrap(), "`name`");
        assert_eq!(quote_identifier("table`name").unwrap(), "`table``name`");
        assert!(quote_identifier("  ").is_err());
    }

    #[test]
    fn test_select_with_operator() {
        let conditions = cols(&[
            ("lname", Value::Text("Zouhir".to_string())),
            ("age", Value::Integer(25)),
        ]);
        let stmt = SqlStatement::select("names", &conditions, Operator::Or).unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT * FROM `names` WHERE `lname` = ? OR `age` = ?"
        );
        assert_eq!(stmt.params().len(), 2);
        assert!(stmt.validate_param_count().is_ok());
    }

    #[test]
    fn test_select_without_conditions() {
        let stmt = SqlStatement::select("names", &[], Operator::And).unwrap();
        assert_eq!(stmt.sql(), "SELECT * FROM `names`");
        assert!(stmt.params().is_empty());
    }

    #[test]
    fn test_insert() {
        let columns = cols(&[
            ("lname", Value::Text("Zouhir".to_string())),
            ("age", Value::Integer(25)),
        ]);
        let stmt = SqlStatement::insert("names", &columns).unwrap();
        assert_eq!(
            stmt.sql(),
            "INSERT INTO `names` (`lname`, `age`) VALUES (?, ?)"
        );
        assert_eq!(stmt.params()[1], Value::Integer(25));
        assert!(SqlStatement::insert("names", &[]).is_err());
    }

    #[test]
    fn test_update_joins_conditions_with_and() {
        let columns = cols(&[("lname", Value::Text("Rahou".to_string()))]);
        let conditions = cols(&[("id", Value::Integer(1)), ("age", Value::Integer(25))]);
        let stmt = SqlStatement::update("names", &columns, &conditions).unwrap();
        assert_eq!(
            stmt.sql(),
            "UPDATE `names` SET `lname` = ? WHERE `id` = ? AND `age` = ?"
        );
        assert_eq!(
            stmt.params(),
            &[
                Value::Text("Rahou".to_string()),
                Value::Integer(1),
                Value::Integer(25)
            ]
        );
        assert!(SqlStatement::update("names", &columns, &[]).is_err());
    }

    #[test]
    fn test_delete() {
        let conditions = cols(&[("id", Value::Integer(3))]);
        let stmt = SqlStatement::delete("names", &conditions).unwrap();
        assert_eq!(stmt.sql(), "DELETE FROM `names` WHERE `id` = ?");

        let stmt = SqlStatement::delete("names", &[]).unwrap();
        assert_eq!(stmt.sql(), "DELETE FROM `names`");
    }

    #[test]
    fn test_null_condition_uses_null_safe_comparison() {
        let conditions = cols(&[("deleted_at", Value::Null), ("id", Value::Integer(3))]);
        let stmt = SqlStatement::select("names", &conditions, Operator::Or).unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT * FROM `names` WHERE `deleted_at` <=> ? OR `id` = ?"
        );
        assert_eq!(stmt.params(), &[Value::Null, Value::Integer(3)]);

        let columns = cols(&[("deleted_at", Value::Null)]);
        let stmt = SqlStatement::update("names", &columns, &conditions).unwrap();
        assert_eq!(
            stmt.sql(),
            "UPDATE `names` SET `deleted_at` = ? WHERE `deleted_at` <=> ? AND `id` = ?"
        );
    }

    #[test]
    fn test_placeholder_count_skips_quoted_text() {
        let stmt = SqlStatement::new(
            "SELECT '?', `a?b`, \"it\\\"s?\" FROM t WHERE x = ? AND y = 'it''s?'",
        );
        assert_eq!(stmt.placeholder_count(), 1);
        assert!(stmt.validate_param_count().is_err());
    }

    #[test]
    fn test_param_summary() {
        let stmt = SqlStatement::with_params(
            "SELECT * FROM t WHERE a = ? AND b = ? AND c = ?",
            vec![
                Value::Integer(1),
                Value::Text("test_user".to_string()),
                Value::Boolean(true),
            ],
        );
        let summary = stmt.param_summary();
        assert!(summary.contains("$1: INT"));
        assert!(summary.contains("$2: TEXT"));
        assert!(summary.contains("$3: BOOL"));
        assert!(!summary.contains("test_user"));
    }
}
