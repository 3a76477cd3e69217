//! MySQL Connection Implementation
//!
//! One mysql_async connection per handle. No pool: the connection is opened
//! once, used sequentially and closed once.

use super::param_converter::MySqlParamConverter;
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::handlers::database::{
    engine::Connection,
    statement::SqlStatement,
    types::{ExecuteResult, ResultSet, SessionInfo, Value},
};
use async_trait::async_trait;
use mysql_async::{prelude::*, Conn, OptsBuilder, Row};
use secrecy::ExposeSecret;
use tracing::{debug, info};

/// MySQL Database Connection
pub struct MySqlConnection {
    conn: Conn,
    session: SessionInfo,
}

impl MySqlConnection {
    /// Connect using the handler configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(
            host = %config.hostname,
            port = config.port,
            database = %config.database,
            "Connecting to MySQL"
        );

        let mut conn = Conn::new(Self::build_opts(config)).await.map_err(|e| {
            Error::Connection(format!("Failed to connect to MySQL: {}", e))
        })?;

        let session = Self::load_session(&mut conn).await?;
        debug!(
            charset = %session.charset,
            no_backslash_escapes = session.no_backslash_escapes,
            server_version = %session.server_version,
            "MySQL session ready"
        );

        Ok(Self { conn, session })
    }

    /// Connection options, including the session init statements
    pub fn build_opts(config: &DatabaseConfig) -> OptsBuilder {
        OptsBuilder::default()
            .ip_or_hostname(config.hostname.clone())
            .tcp_port(config.port)
            .user(Some(config.username.clone()))
            .pass(Some(config.password.expose_secret().to_string()))
            .db_name(Some(config.database.clone()))
            .init(config.init_statements())
    }

    async fn load_session(conn: &mut Conn) -> Result<SessionInfo> {
        let row: Option<(String, String, String)> = conn
            .query_first("SELECT @@character_set_connection, @@SESSION.sql_mode, VERSION()")
            .await
            .map_err(|e| Error::Connection(format!("Failed to read session settings: {}", e)))?;

        let (charset, sql_mode, version) = row.ok_or_else(|| {
            Error::Connection("Server returned no session settings".to_string())
        })?;

        Ok(SessionInfo::from_sql_mode(charset, &sql_mode, version))
    }

    fn convert_rows(rows: Vec<Row>) -> ResultSet {
        let columns = rows
            .first()
            .map(|row| {
                row.columns_ref()
                    .iter()
                    .map(|col| col.name_str().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let rows = rows
            .into_iter()
            .map(|row| {
                let values: Vec<mysql_async::Value> = row.unwrap();
                values
                    .into_iter()
                    .map(MySqlParamConverter::convert_from_mysql_value)
                    .collect::<Vec<Value>>()
            })
            .collect();

        ResultSet { columns, rows }
    }
}

/// Map driver errors, separating a dropped connection from a rejected statement
pub(crate) fn map_driver_error(err: mysql_async::Error, context: &str) -> Error {
    match err {
        mysql_async::Error::Io(e) => Error::ConnectionLost(format!("{}: {}", context, e)),
        mysql_async::Error::Driver(mysql_async::DriverError::ConnectionClosed) => {
            Error::ConnectionLost(format!("{}: connection closed", context))
        }
        other => Error::Query(format!("{} failed: {}", context, other)),
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    async fn query(&mut self, statement: &SqlStatement) -> Result<ResultSet> {
        let result: std::result::Result<Vec<Row>, mysql_async::Error> =
            if statement.params().is_empty() {
                self.conn.query(statement.sql()).await
            } else {
                let params = MySqlParamConverter::convert_params(statement.params());
                self.conn.exec(statement.sql(), params).await
            };
        let rows = result.map_err(|e| map_driver_error(e, "Query"))?;

        Ok(Self::convert_rows(rows))
    }

    async fn execute(&mut self, statement: &SqlStatement) -> Result<ExecuteResult> {
        if statement.params().is_empty() {
            self.conn.query_drop(statement.sql()).await
        } else {
            let params = MySqlParamConverter::convert_params(statement.params());
            self.conn.exec_drop(statement.sql(), params).await
        }
        .map_err(|e| map_driver_error(e, "Execute"))?;

        Ok(ExecuteResult {
            rows_affected: self.conn.affected_rows(),
            last_insert_id: self.conn.last_insert_id().filter(|id| *id > 0),
        })
    }

    async fn ping(&mut self) -> Result<()> {
        self.conn
            .ping()
            .await
            .map_err(|e| map_driver_error(e, "Ping"))
    }

    fn session(&self) -> &SessionInfo {
        &self.session
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .disconnect()
            .await
            .map_err(|e| map_driver_error(e, "Disconnect"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_connection_maps_to_lost() {
        let err = map_driver_error(
            mysql_async::Error::Driver(mysql_async::DriverError::ConnectionClosed),
            "Query",
        );
        assert!(matches!(err, Error::ConnectionLost(_)));
    }

    #[test]
    fn test_io_error_maps_to_lost() {
        let io = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        let err = map_driver_error(
            mysql_async::Error::Io(mysql_async::IoError::Io(io)),
            "Execute",
        );
        assert!(matches!(err, Error::ConnectionLost(ref m) if m.starts_with("Execute: ")));
    }

    #[test]
    fn test_other_driver_errors_map_to_query() {
        let err = map_driver_error(
            mysql_async::Error::Driver(mysql_async::DriverError::PoolDisconnected),
            "Query",
        );
        assert!(matches!(err, Error::Query(_)));
    }
}
