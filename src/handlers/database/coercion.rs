//! Type inference and value cleaning
//!
//! Infers a column's [`TypeHint`] from an untyped value and normalizes values
//! per hint before they are bound or escaped. Conversions follow the loose
//! scripting-language rules the helper has always used: `"12abc"` is 12 as an
//! integer, `"0"` is false, `false` stringifies to an empty string.

use super::types::{RawValue, TypeHint, Value};
use crate::error::{Error, FormatError, Result};
use chrono::{Local, TimeZone};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::warn;
use validator::ValidateEmail;

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\n\r\x0B\x0C]*[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?[ \t\n\r\x0B\x0C]*$")
        .expect("numeric pattern is valid")
});

static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\n\r\x0B\x0C]*[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?")
        .expect("numeric prefix pattern is valid")
});

static INTEGER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\n\r\x0B\x0C]*[+-]?[0-9]+").expect("integer prefix pattern is valid")
});

static DATETIME_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9\-: ]").expect("datetime noise pattern is valid"));

static DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2})$")
        .expect("datetime pattern is valid")
});

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)#[0-9a-f]{6}").expect("hex color pattern is valid"));

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Guess a hint for a value that came without one.
///
/// Email detection runs first, so a numeric-looking `"123@45"` is an email.
pub fn infer_hint(name: &str, value: &RawValue) -> TypeHint {
    let text = stringify(value);

    if name == "email" || text.contains('@') {
        return TypeHint::Email;
    }

    if is_numeric(value) {
        let number = to_float(value);
        return if !number.is_finite() || number.trunc() != number {
            TypeHint::Float
        } else {
            TypeHint::Integer
        };
    }

    match value {
        RawValue::Boolean(_) => TypeHint::Boolean,
        _ if text.contains('#') && text.chars().count() == 7 => TypeHint::HexColor,
        RawValue::Text(_) => TypeHint::String,
        _ => TypeHint::None,
    }
}

/// Normalize a raw value according to `hint`.
pub fn clean(value: &RawValue, hint: TypeHint) -> std::result::Result<Value, FormatError> {
    match hint {
        TypeHint::None => Ok(passthrough(value)),
        TypeHint::String => Ok(Value::Text(stringify(value).into_owned())),
        TypeHint::Integer => Ok(Value::Integer(to_integer(value))),
        TypeHint::Float => {
            let number = to_float(value);
            if number.is_finite() {
                Ok(Value::Float(number))
            } else {
                Err(FormatError::NonFinite {
                    input: stringify(value).into_owned(),
                })
            }
        }
        TypeHint::Boolean => Ok(Value::Boolean(to_bool(value))),
        TypeHint::DateTime => clean_datetime(&stringify(value)),
        TypeHint::TimestampToDateTime => {
            let seconds = to_integer(value);
            Local
                .timestamp_opt(seconds, 0)
                .single()
                .map(|dt| Value::DateTime(dt.format(DATETIME_FORMAT).to_string()))
                .ok_or(FormatError::Timestamp(seconds))
        }
        TypeHint::HexColor => {
            let text = stringify(value);
            match HEX_COLOR.find(&text) {
                Some(color) => Ok(Value::HexColor(color.as_str().to_string())),
                None => Err(FormatError::HexColor {
                    input: text.into_owned(),
                }),
            }
        }
        TypeHint::Email => {
            let text = stringify(value);
            if is_valid_email(&text) {
                Ok(Value::Email(text.into_owned()))
            } else {
                // invalid addresses degrade to an empty value instead of failing the record
                warn!("Rejected invalid email address");
                Ok(Value::Text(String::new()))
            }
        }
    }
}

fn clean_datetime(input: &str) -> std::result::Result<Value, FormatError> {
    let stripped = DATETIME_NOISE.replace_all(input.trim(), "");
    DATETIME
        .captures(&stripped)
        .and_then(|captures| captures.get(1))
        .map(|m| Value::DateTime(m.as_str().to_string()))
        .ok_or_else(|| FormatError::DateTime {
            input: input.to_string(),
        })
}

/// Hint for each of `field_count` fields.
///
/// No hints means every field is inferred (`None` entries), a single hint
/// applies to every field, and a full list applies positionally. Any other
/// length is a configuration error.
pub fn resolve_hints(field_count: usize, hints: &[TypeHint]) -> Result<Vec<Option<TypeHint>>> {
    match hints.len() {
        0 => Ok(vec![None; field_count]),
        n if n == field_count => Ok(hints.iter().copied().map(Some).collect()),
        1 => Ok(vec![Some(hints[0]); field_count]),
        n => Err(Error::Configuration(format!(
            "{} type hints supplied for {} fields",
            n, field_count
        ))),
    }
}

pub fn is_valid_email(input: &str) -> bool {
    input.to_string().validate_email()
}

/// Loose string form: null is empty, booleans are "1"/"".
pub fn stringify(value: &RawValue) -> Cow<'_, str> {
    match value {
        RawValue::Null => Cow::Borrowed(""),
        RawValue::Boolean(true) => Cow::Borrowed("1"),
        RawValue::Boolean(false) => Cow::Borrowed(""),
        RawValue::Integer(i) => Cow::Owned(i.to_string()),
        RawValue::Float(f) => Cow::Owned(format_float(*f)),
        RawValue::Text(s) => Cow::Borrowed(s.as_str()),
    }
}

/// Shortest decimal form; integral floats print without a fraction.
pub fn format_float(value: f64) -> String {
    format!("{}", value)
}

pub fn is_numeric(value: &RawValue) -> bool {
    match value {
        RawValue::Integer(_) | RawValue::Float(_) => true,
        RawValue::Text(s) => NUMERIC.is_match(s),
        RawValue::Null | RawValue::Boolean(_) => false,
    }
}

pub fn to_float(value: &RawValue) -> f64 {
    match value {
        RawValue::Null => 0.0,
        RawValue::Boolean(b) => f64::from(u8::from(*b)),
        RawValue::Integer(i) => *i as f64,
        RawValue::Float(f) => *f,
        RawValue::Text(s) => NUMERIC_PREFIX
            .find(s)
            .and_then(|m| m.as_str().trim().parse::<f64>().ok())
            .unwrap_or(0.0),
    }
}

pub fn to_integer(value: &RawValue) -> i64 {
    match value {
        RawValue::Null => 0,
        RawValue::Boolean(b) => i64::from(*b),
        RawValue::Integer(i) => *i,
        RawValue::Float(f) => truncate(*f),
        RawValue::Text(s) => {
            let Some(prefix) = NUMERIC_PREFIX.find(s) else {
                return 0;
            };
            let prefix = prefix.as_str().trim();
            let is_plain_integer = INTEGER_PREFIX
                .find(prefix)
                .is_some_and(|m| m.as_str().trim() == prefix);
            if is_plain_integer {
                // saturate like the float path instead of losing precision through f64
                prefix.parse::<i64>().unwrap_or_else(|_| {
                    if prefix.starts_with('-') {
                        i64::MIN
                    } else {
                        i64::MAX
                    }
                })
            } else {
                prefix.parse::<f64>().map(truncate).unwrap_or(0)
            }
        }
    }
}

fn truncate(value: f64) -> i64 {
    if value.is_finite() {
        value.trunc() as i64
    } else {
        0
    }
}

pub fn to_bool(value: &RawValue) -> bool {
    match value {
        RawValue::Null => false,
        RawValue::Boolean(b) => *b,
        RawValue::Integer(i) => *i != 0,
        RawValue::Float(f) => *f != 0.0,
        RawValue::Text(s) => !(s.is_empty() || s == "0"),
    }
}

fn passthrough(value: &RawValue) -> Value {
    match value {
        RawValue::Null => Value::Null,
        RawValue::Text(s) => Value::Text(s.clone()),
        RawValue::Integer(i) => Value::Integer(*i),
        RawValue::Float(f) => Value::Float(*f),
        RawValue::Boolean(b) => Value::Boolean(*b),
    }
}
