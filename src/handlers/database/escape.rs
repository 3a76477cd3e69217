//! Connection-aware string escaping
//!
//! Escapes text for embedding inside a single-quoted SQL literal using the
//! rules of the live session: the connection character set and the
//! `NO_BACKSLASH_ESCAPES` SQL mode, both read when the connection is opened.
//! The literal itself comes from the driver (`mysql_async::Value::as_sql`).

use super::types::SessionInfo;
use crate::error::{Error, Result};

/// Character sets where 0x5C can be the trailing byte of a multi-byte character.
/// Escaping UTF-8 input byte-wise for them reopens the classic injection hole.
const UNSAFE_CHARSETS: &[&str] = &["big5", "cp932", "gbk", "gb18030", "sjis"];

/// Escapes text for a single-quoted SQL literal
pub trait Escaper: Send + Sync {
    /// Escaped body, without the surrounding quotes
    fn escape(&self, text: &str) -> Result<String>;

    /// Escaped and quoted literal
    fn quote(&self, text: &str) -> Result<String> {
        Ok(format!("'{}'", self.escape(text)?))
    }
}

/// Escaper bound to one connection's session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEscaper {
    charset: String,
    no_backslash_escapes: bool,
}

impl SessionEscaper {
    pub fn for_session(session: &SessionInfo) -> Result<Self> {
        let charset = session.charset.to_ascii_lowercase();
        if UNSAFE_CHARSETS.contains(&charset.as_str()) {
            return Err(Error::UnsupportedCharset(charset));
        }

        Ok(Self {
            charset,
            no_backslash_escapes: session.no_backslash_escapes,
        })
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }
}

#[cfg(feature = "mysql-backend")]
impl Escaper for SessionEscaper {
    fn escape(&self, text: &str) -> Result<String> {
        let quoted = self.quote(text)?;
        quoted
            .strip_prefix('\'')
            .and_then(|body| body.strip_suffix('\''))
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Validation(format!("Driver returned an unquoted literal: {}", quoted))
            })
    }

    fn quote(&self, text: &str) -> Result<String> {
        let value = mysql_async::Value::Bytes(text.as_bytes().to_vec());
        Ok(value.as_sql(self.no_backslash_escapes))
    }
}
