//! Handler implementations
//!
//! このモジュールはデータベースアクセス用のハンドラーを提供します。

pub mod database;

pub use database::Database;
