//! MySQL module organization
//!
//! This module contains the mysql_async backed connection and its value conversion

pub mod connection;
pub mod param_converter;

pub use connection::MySqlConnection;
pub use param_converter::MySqlParamConverter;
