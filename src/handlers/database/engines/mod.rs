//! Database engine implementations

#[cfg(feature = "mysql-backend")]
pub mod mysql;
