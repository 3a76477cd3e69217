//! Handler configuration
//!
//! 接続設定とログ設定。読み込みは [`loader::ConfigLoader`] が行う。

pub mod loader;

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use regex::Regex;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

pub use loader::ConfigLoader;

static CHARSET_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("charset pattern is valid"));

static SESSION_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("session key pattern is valid")
});

static SESSION_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_+\-:.,/ ]*$").expect("session value pattern is valid")
});

/// 全体設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HandlerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// データベース接続設定
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct DatabaseConfig {
    #[serde(default = "default_hostname")]
    #[validate(length(min = 1, message = "hostname is required"))]
    pub hostname: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    /// パスワード（シリアライズしない）
    #[serde(default = "empty_password", skip_serializing)]
    pub password: SecretString,
    #[serde(default)]
    #[validate(length(min = 1, message = "database is required"))]
    pub database: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `SET NAMES` に使う接続文字セット
    #[serde(default = "default_charset")]
    #[validate(custom(function = validate_charset))]
    pub charset: String,
    /// 接続時に設定するセッション変数
    #[serde(default)]
    #[validate(custom(function = validate_session))]
    pub session: BTreeMap<String, String>,
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn empty_password() -> SecretString {
    SecretString::new(String::new().into_boxed_str())
}

fn default_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn validate_charset(charset: &str) -> std::result::Result<(), ValidationError> {
    if CHARSET_NAME.is_match(charset) {
        Ok(())
    } else {
        Err(ValidationError::new("charset").with_message("invalid character set name".into()))
    }
}

fn validate_session(session: &BTreeMap<String, String>) -> std::result::Result<(), ValidationError> {
    for (key, value) in session {
        if !SESSION_KEY.is_match(key) {
            return Err(ValidationError::new("session")
                .with_message(format!("invalid session variable name: {}", key).into()));
        }
        if !SESSION_VALUE.is_match(value) {
            return Err(ValidationError::new("session")
                .with_message(format!("invalid value for session variable {}", key).into()));
        }
    }
    Ok(())
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            username: String::new(),
            password: empty_password(),
            database: String::new(),
            port: default_port(),
            charset: default_charset(),
            session: BTreeMap::new(),
        }
    }
}

impl DatabaseConfig {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: SecretString::new(password.into().into_boxed_str()),
            database: database.into(),
            ..Self::default()
        }
    }

    /// 必須項目・文字セット名・セッション変数を検証
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// 接続直後に実行する文
    ///
    /// 数字のみの値はそのまま、それ以外は引用符付きで設定する。
    pub fn init_statements(&self) -> Vec<String> {
        let mut statements = vec![format!("SET NAMES {}", self.charset)];
        statements.extend(self.session.iter().map(|(key, value)| {
            if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
                format!("SET SESSION {} = {}", key, value)
            } else {
                format!("SET SESSION {} = '{}'", key, value)
            }
        }));
        statements
    }
}
