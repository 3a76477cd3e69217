//! # mysql-handler
//!
//! Single-connection MySQL helper. Records are cleaned by type hint (or by
//! inference when no hint is given), then either bound as statement
//! parameters for CRUD operations or escaped for literal embedding using the
//! live connection's character set and SQL mode.

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;

pub use config::{ConfigLoader, DatabaseConfig, HandlerConfig};
pub use error::{Error, FormatError, Result};
pub use handlers::database::{
    CleanRecord, Connection, Database, EscapedRecord, Escaper, ExecuteResult, FetchMode,
    FetchedRow, Operator, RawValue, Record, ResultSet, SessionEscaper, SessionInfo,
    SqlStatement, TypeHint, Value,
};
pub use logging::{init_logging, LogFormat, LoggingConfig};
