//! Error types for the MySQL handler.

use thiserror::Error;

/// Result type alias for handler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for handler operations
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Connecting to the server failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The handle never connected, or lost its connection earlier
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// The connection dropped while an operation was running
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A value did not match the format its type hint requires
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// The server rejected a statement
    #[error("Query execution failed: {0}")]
    Query(String),

    /// Configuration error (settings, type hints, routing)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The connection character set cannot be escaped safely
    #[error("Unsupported character set for escaping: {0}")]
    UnsupportedCharset(String),
}

impl Error {
    /// Whether the error leaves the handle without a usable connection
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::NotConnected(_) | Error::ConnectionLost(_)
        )
    }
}

/// Value cleaning errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Not a `YYYY-MM-DD HH:MM:SS` datetime after stripping
    #[error("invalid datetime {input:?}: expected YYYY-MM-DD HH:MM:SS")]
    DateTime { input: String },

    /// No `#rrggbb` substring present
    #[error("invalid hex color {input:?}: expected #rrggbb")]
    HexColor { input: String },

    /// Epoch seconds outside the representable calendar range
    #[error("timestamp {0} is out of range")]
    Timestamp(i64),

    /// Numeric text that overflows to infinity or NaN as a float
    #[error("number {input:?} is not finite")]
    NonFinite { input: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_converts() {
        let err: Error = FormatError::HexColor {
            input: "red".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Format(_)));
        assert!(err.to_string().contains("#rrggbb"));

        let err = FormatError::NonFinite {
            input: "1e400".to_string(),
        };
        assert_eq!(err.to_string(), "number \"1e400\" is not finite");
    }

    #[test]
    fn test_connection_error_classification() {
        assert!(Error::ConnectionLost("reset".to_string()).is_connection_error());
        assert!(Error::NotConnected("never".to_string()).is_connection_error());
        assert!(!Error::Query("syntax".to_string()).is_connection_error());
    }
}
