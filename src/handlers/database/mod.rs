//! Database Handler Module
//!
//! 型推論・クリーニング・エスケープのパイプラインと CRUD 操作を提供

pub mod coercion;
pub mod engine;
pub mod engines;
pub mod escape;
pub mod handler;
pub mod pipeline;
pub mod statement;
pub mod types;


// 公開API
pub use engine::Connection;
pub use escape::{Escaper, SessionEscaper};
pub use handler::Database;
pub use pipeline::{coerce, escape_record, CleanRecord, EscapedRecord};
pub use statement::SqlStatement;
pub use types::{
    ExecuteResult, FetchMode, FetchedRow, Field, FieldValue, Operator, RawValue, Record,
    ResultSet, SessionInfo, TypeHint, Value,
};

#[cfg(feature = "mysql-backend")]
pub use engines::mysql::MySqlConnection;
