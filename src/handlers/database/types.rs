//! Database Types and Common Structures
//!
//! ハンドラーで使用される共通の型定義

use super::coercion;
use crate::error::{Error, FormatError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 型ヒント
///
/// 値をバインドまたはエスケープする前に適用する正規化の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeHint {
    None,
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    TimestampToDateTime,
    HexColor,
    Email,
}

impl TypeHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeHint::None => "none",
            TypeHint::String => "string",
            TypeHint::Integer => "integer",
            TypeHint::Float => "float",
            TypeHint::Boolean => "boolean",
            TypeHint::DateTime => "datetime",
            TypeHint::TimestampToDateTime => "ts2dt",
            TypeHint::HexColor => "hexcolor",
            TypeHint::Email => "email",
        }
    }

    /// `"string|int|email"` 形式のヒント列を解析
    pub fn parse_list(list: &str) -> Result<Vec<TypeHint>> {
        list.split('|')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for TypeHint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(TypeHint::None),
            "str" | "string" => Ok(TypeHint::String),
            "int" | "integer" => Ok(TypeHint::Integer),
            "float" => Ok(TypeHint::Float),
            "bool" | "boolean" => Ok(TypeHint::Boolean),
            "datetime" => Ok(TypeHint::DateTime),
            "ts2dt" => Ok(TypeHint::TimestampToDateTime),
            "hexcolor" => Ok(TypeHint::HexColor),
            "email" => Ok(TypeHint::Email),
            other => Err(Error::Configuration(format!("Unknown type hint: {}", other))),
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 型なしの入力値
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Integer(i)
    }
}

impl From<i32> for RawValue {
    fn from(i: i32) -> Self {
        RawValue::Integer(i as i64)
    }
}

impl From<u32> for RawValue {
    fn from(i: u32) -> Self {
        RawValue::Integer(i as i64)
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        RawValue::Float(f)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Boolean(b)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Null)
    }
}

/// 正規化済みの値
///
/// クリーニングの出力。各バリアントは SQL に埋め込む正規テキストを持つ。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(String),
    HexColor(String),
    Email(String),
}

impl Value {
    /// Validated `YYYY-MM-DD HH:MM:SS` datetime
    pub fn datetime(input: &str) -> std::result::Result<Self, FormatError> {
        coercion::clean(&RawValue::from(input), TypeHint::DateTime)
    }

    /// First `#rrggbb` color found in the input
    pub fn hex_color(input: &str) -> std::result::Result<Self, FormatError> {
        coercion::clean(&RawValue::from(input), TypeHint::HexColor)
    }

    /// Validated email address, `None` when invalid
    pub fn email(input: &str) -> Option<Self> {
        if coercion::is_valid_email(input) {
            Some(Value::Email(input.to_string()))
        } else {
            None
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical text embedded in SQL for this value
    pub fn to_sql_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(true) => "1".to_string(),
            Value::Boolean(false) => "0".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => coercion::format_float(*f),
            Value::Text(s) | Value::DateTime(s) | Value::HexColor(s) | Value::Email(s) => {
                s.clone()
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Text(_) => "TEXT",
            Value::Integer(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::Boolean(_) => "BOOL",
            Value::DateTime(_) => "DATETIME",
            Value::HexColor(_) => "HEXCOLOR",
            Value::Email(_) => "EMAIL",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_text())
    }
}

/// フィールド値（型なし、または呼び出し側で型付け済み）
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Raw(RawValue),
    Typed(Value),
}

impl FieldValue {
    fn as_text(&self) -> String {
        match self {
            FieldValue::Raw(raw) => coercion::stringify(raw).into_owned(),
            FieldValue::Typed(value) => value.to_sql_text(),
        }
    }
}

/// カラム名と値の組
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// レコード
///
/// 1 行分のカラムデータ。`table` 疑似フィールドはルーティング情報として扱われる。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
    hints: Vec<TypeHint>,
}

impl Record {
    /// Routing pseudo-field carried alongside the column data
    pub const TABLE_FIELD: &'static str = "table";

    pub fn new() -> Self {
        Self::default()
    }

    /// Start a record routed to `table`
    pub fn table(table: impl Into<String>) -> Self {
        let table: String = table.into();
        Self::new().field(Self::TABLE_FIELD, table)
    }

    /// Set a column to an untyped value, replacing an existing column of the same name in place
    pub fn field(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.set(name.into(), FieldValue::Raw(value.into()));
        self
    }

    /// Set a column to an already typed value; it skips inference and cleaning
    pub fn typed(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name.into(), FieldValue::Typed(value));
        self
    }

    /// Positional type hints for the data fields
    pub fn with_hints(mut self, hints: Vec<TypeHint>) -> Self {
        self.hints = hints;
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.set(name.into(), FieldValue::Raw(value.into()));
    }

    fn set(&mut self, name: String, value: FieldValue) {
        match self.fields.iter_mut().find(|field| field.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field { name, value }),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn hints(&self) -> &[TypeHint] {
        &self.hints
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Remove the `table` pseudo-field and return its value as text
    pub fn take_table(&mut self) -> Option<String> {
        let index = self
            .fields
            .iter()
            .position(|field| field.name == Self::TABLE_FIELD)?;
        Some(self.fields.remove(index).value.as_text())
    }

    pub fn into_parts(self) -> (Vec<Field>, Vec<TypeHint>) {
        (self.fields, self.hints)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<RawValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.push(name, value);
        }
        record
    }
}

/// WHERE 句の結合演算子
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[default]
    And,
    Or,
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Operator::And),
            "OR" => Ok(Operator::Or),
            other => Err(Error::Validation(format!("Unsupported operator: {}", other))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => write!(f, "AND"),
            Operator::Or => write!(f, "OR"),
        }
    }
}

/// 取得モード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchMode {
    /// カラム名でアクセス
    Assoc,
    /// 位置でアクセス
    Num,
    /// 両方
    #[default]
    Both,
}

impl FetchMode {
    /// Unrecognized names fall back to [`FetchMode::Both`]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "assoc" | "associative" => FetchMode::Assoc,
            "num" | "numeral" | "numeric" => FetchMode::Num,
            _ => FetchMode::Both,
        }
    }
}

impl From<&str> for FetchMode {
    fn from(name: &str) -> Self {
        FetchMode::parse(name)
    }
}

/// クエリ結果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    /// カラム名
    pub columns: Vec<String>,
    /// 行データ
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// At most `limit` rows shaped by `mode`
    pub fn fetch(&self, limit: usize, mode: FetchMode) -> Vec<FetchedRow> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| FetchedRow::new(&self.columns, row, mode))
            .collect()
    }

    pub fn first(&self, mode: FetchMode) -> Option<FetchedRow> {
        self.fetch(1, mode).into_iter().next()
    }
}

/// 取得モードに応じて整形された行
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRow {
    named: Option<Vec<(String, Value)>>,
    positional: Option<Vec<Value>>,
}

impl FetchedRow {
    fn new(columns: &[String], row: &[Value], mode: FetchMode) -> Self {
        let named = || {
            columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect::<Vec<_>>()
        };
        match mode {
            FetchMode::Assoc => Self {
                named: Some(named()),
                positional: None,
            },
            FetchMode::Num => Self {
                named: None,
                positional: Some(row.to_vec()),
            },
            FetchMode::Both => Self {
                named: Some(named()),
                positional: Some(row.to_vec()),
            },
        }
    }

    /// Column by name; `None` in [`FetchMode::Num`]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.named
            .as_ref()?
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column by position; `None` in [`FetchMode::Assoc`]
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.positional.as_ref()?.get(index)
    }

    /// JSON shape: object for assoc, array for num, object with both keys for both
    pub fn to_json(&self) -> serde_json::Value {
        match (&self.named, &self.positional) {
            (None, Some(values)) => serde_json::json!(values),
            (named, positional) => {
                let mut object = serde_json::Map::new();
                for (index, value) in positional.iter().flatten().enumerate() {
                    object.insert(index.to_string(), serde_json::json!(value));
                }
                for (name, value) in named.iter().flatten() {
                    object.insert(name.clone(), serde_json::json!(value));
                }
                serde_json::Value::Object(object)
            }
        }
    }
}

/// コマンド実行結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecuteResult {
    /// 影響を受けた行数
    pub rows_affected: u64,
    /// 最後に挿入されたID（AUTO_INCREMENTなど）
    pub last_insert_id: Option<u64>,
}

/// 接続セッション情報
///
/// エスケープ処理は接続時に読み取ったこの情報に依存する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// `@@character_set_connection`
    pub charset: String,
    /// `NO_BACKSLASH_ESCAPES` が sql_mode に含まれるか
    pub no_backslash_escapes: bool,
    pub server_version: String,
}

impl SessionInfo {
    pub fn from_sql_mode(charset: String, sql_mode: &str, server_version: String) -> Self {
        let no_backslash_escapes = sql_mode
            .split(',')
            .any(|mode| mode.trim().eq_ignore_ascii_case("NO_BACKSLASH_ESCAPES"));
        Self {
            charset,
            no_backslash_escapes,
            server_version,
        }
    }
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            charset: "utf8mb4".to_string(),
            no_backslash_escapes: false,
            server_version: "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        ResultSet {
            columns: vec!["id".to_string(), "lname".to_string()],
            rows: vec![
                vec![Value::Integer(1), Value::Text("Zouhir".to_string())],
                vec![Value::Integer(2), Value::Text("Rahou".to_string())],
            ],
        }
    }

    #[test]
    fn test_type_hint_aliases() {
        assert_eq!("int".parse::<TypeHint>().unwrap(), TypeHint::Integer);
        assert_eq!("Str".parse::<TypeHint>().unwrap(), TypeHint::String);
        assert_eq!("ts2dt".parse::<TypeHint>().unwrap(), TypeHint::TimestampToDateTime);
        assert!("uuid".parse::<TypeHint>().is_err());
    }

    #[test]
    fn test_parse_hint_list() {
        let hints = TypeHint::parse_list("string|int| email").unwrap();
        assert_eq!(
            hints,
            vec![TypeHint::String, TypeHint::Integer, TypeHint::Email]
        );
    }

    #[test]
    fn test_record_field_replaces_in_place() {
        let record = Record::table("names")
            .field("lname", "Zouhir")
            .field("age", 25)
            .field("lname", "Rahou");
        assert_eq!(record.len(), 3);
        assert_eq!(record.fields()[1].name, "lname");
        assert_eq!(
            record.fields()[1].value,
            FieldValue::Raw(RawValue::from("Rahou"))
        );
    }

    #[test]
    fn test_take_table_strips_pseudo_field() {
        let mut record = Record::table("names").field("age", 25);
        assert_eq!(record.take_table().as_deref(), Some("names"));
        assert!(record.fields().iter().all(|f| f.name != Record::TABLE_FIELD));
        assert_eq!(record.take_table(), None);
    }

    #[test]
    fn test_fetch_mode_parse() {
        assert_eq!(FetchMode::parse("associative"), FetchMode::Assoc);
        assert_eq!(FetchMode::parse("numeral"), FetchMode::Num);
        assert_eq!(FetchMode::parse("whatever"), FetchMode::Both);
    }

    #[test]
    fn test_fetch_respects_limit_and_mode() {
        let rows = sample().fetch(1, FetchMode::Assoc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("lname"), Some(&Value::Text("Zouhir".to_string())));
        assert_eq!(rows[0].at(0), None);

        let rows = sample().fetch(10, FetchMode::Num);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].at(0), Some(&Value::Integer(2)));
        assert_eq!(rows[1].get("id"), None);
    }

    #[test]
    fn test_both_mode_json_has_both_keys() {
        let row = sample().first(FetchMode::Both).unwrap();
        let json = row.to_json();
        assert_eq!(json["0"], serde_json::json!(1));
        assert_eq!(json["lname"], serde_json::json!("Zouhir"));
    }

    #[test]
    fn test_sql_text() {
        assert_eq!(Value::Boolean(false).to_sql_text(), "0");
        assert_eq!(Value::Float(10.5).to_sql_text(), "10.5");
        assert_eq!(Value::Null.to_sql_text(), "");
    }

    #[test]
    fn test_session_sql_mode() {
        let session = SessionInfo::from_sql_mode(
            "utf8mb4".to_string(),
            "STRICT_TRANS_TABLES,NO_BACKSLASH_ESCAPES",
            "8.0.36".to_string(),
        );
        assert!(session.no_backslash_escapes);
    }
}
