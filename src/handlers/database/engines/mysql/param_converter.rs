//! MySQL Parameter Conversion Utilities
//!
//! Converts between handler [`Value`]s and mysql_async values. Bound
//! parameters never pass through SQL text, which keeps user input out of
//! the statement itself.

use crate::handlers::database::types::Value;

/// MySQL parameter conversion utility for bound query execution
pub struct MySqlParamConverter;

impl MySqlParamConverter {
    /// Convert a handler Value to mysql_async::Value
    pub fn convert_value(value: &Value) -> mysql_async::Value {
        match value {
            Value::Null => mysql_async::Value::NULL,
            Value::Boolean(b) => mysql_async::Value::Int(i64::from(*b)),
            Value::Integer(i) => mysql_async::Value::Int(*i),
            Value::Float(f) => mysql_async::Value::Double(*f),
            Value::Text(s) | Value::DateTime(s) | Value::HexColor(s) | Value::Email(s) => {
                mysql_async::Value::Bytes(s.as_bytes().to_vec())
            }
        }
    }

    /// Convert a batch of parameters; no parameters means `Params::Empty`
    pub fn convert_params(params: &[Value]) -> mysql_async::Params {
        if params.is_empty() {
            return mysql_async::Params::Empty;
        }
        mysql_async::Params::Positional(params.iter().map(Self::convert_value).collect())
    }

    /// Convert mysql_async::Value back to a handler Value
    ///
    /// Used for converting query results back to our internal format
    pub fn convert_from_mysql_value(mysql_value: mysql_async::Value) -> Value {
        match mysql_value {
            mysql_async::Value::NULL => Value::Null,
            mysql_async::Value::Int(i) => Value::Integer(i),
            mysql_async::Value::UInt(u) => match i64::try_from(u) {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Text(u.to_string()),
            },
            mysql_async::Value::Float(f) => Value::Float(f64::from(f)),
            mysql_async::Value::Double(d) => Value::Float(d),
            mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(s) => Value::Text(s),
                Err(e) => Value::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            },
            mysql_async::Value::Date(year, month, day, hour, minute, second, micros) => {
                let mut datetime = format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                );
                if micros > 0 {
                    datetime.push_str(&format!(".{:06}", micros));
                }
                Value::DateTime(datetime)
            }
            mysql_async::Value::Time(is_negative, days, hours, minutes, seconds, micros) => {
                let mut time = format!(
                    "{}{:02}:{:02}:{:02}",
                    if is_negative { "-" } else { "" },
                    days * 24 + u32::from(hours),
                    minutes,
                    seconds
                );
                if micros > 0 {
                    time.push_str(&format!(".{:06}", micros));
                }
                Value::Text(time)
            }
        }
    }
}
