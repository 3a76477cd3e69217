//! Database Handle Implementation
//!
//! 呼び出し側が所有する単一接続のデータベースハンドル

#[cfg(feature = "mysql-backend")]
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
#[cfg(feature = "mysql-backend")]
use crate::handlers::database::{escape::SessionEscaper, pipeline::EscapedRecord};
use crate::handlers::database::{
    engine::Connection,
    pipeline,
    statement::SqlStatement,
    types::{ExecuteResult, Operator, Record, ResultSet, SessionInfo},
};
use std::mem;
use tracing::{debug, info, warn};

/// 接続状態
enum ConnectionState {
    /// 接続済み
    Connected(Box<dyn Connection>),
    /// 接続に失敗した
    Failed(String),
    /// 操作中に接続が切れた
    Lost(String),
    /// 明示的に閉じられた
    Closed,
}

/// データベースハンドル
///
/// 1 ハンドルにつき 1 接続。接続に失敗したハンドルも生成でき、その場合すべての
/// 操作は `Error::NotConnected` を返す。
pub struct Database {
    state: ConnectionState,
    /// 最後の結果セットの行数
    count: usize,
    /// 最後の書き込みで影響を受けた行数
    affected: u64,
}

impl Database {
    /// 接続を確立する。失敗時は `Error::Connection`
    #[cfg(feature = "mysql-backend")]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        use crate::handlers::database::engines::mysql::MySqlConnection;

        config.validate()?;
        let conn = MySqlConnection::connect(config).await?;
        Ok(Self::with_connection(Box::new(conn)))
    }

    /// 接続を試み、失敗しても失敗状態のハンドルを返す
    #[cfg(feature = "mysql-backend")]
    pub async fn open(config: &DatabaseConfig) -> Self {
        match Self::connect(config).await {
            Ok(db) => db,
            Err(e) => {
                warn!(error = %e, "Database connection failed");
                Self::failed(e.to_string())
            }
        }
    }

    /// 既存の接続からハンドルを作成
    pub fn with_connection(connection: Box<dyn Connection>) -> Self {
        Self {
            state: ConnectionState::Connected(connection),
            count: 0,
            affected: 0,
        }
    }

    /// 接続失敗状態のハンドルを作成
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Failed(message.into()),
            count: 0,
            affected: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// 接続エラーメッセージ（接続中は `None`）
    pub fn message(&self) -> Option<&str> {
        match &self.state {
            ConnectionState::Connected(_) => None,
            ConnectionState::Failed(message) | ConnectionState::Lost(message) => Some(message),
            ConnectionState::Closed => Some("Connection closed"),
        }
    }

    /// 最後の結果セットの行数
    pub fn count(&self) -> usize {
        self.count
    }

    /// 最後の書き込みで影響を受けた行数
    pub fn affected(&self) -> u64 {
        self.affected
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        match &self.state {
            ConnectionState::Connected(conn) => Some(conn.session()),
            _ => None,
        }
    }

    fn connection(&mut self) -> Result<&mut Box<dyn Connection>> {
        match &mut self.state {
            ConnectionState::Connected(conn) => Ok(conn),
            ConnectionState::Failed(message) | ConnectionState::Lost(message) => {
                Err(Error::NotConnected(message.clone()))
            }
            ConnectionState::Closed => Err(Error::NotConnected("Connection closed".to_string())),
        }
    }

    /// 接続断を検出したら Lost 状態へ移行
    fn observe<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(Error::ConnectionLost(message)) = &result {
            warn!(error = %message, "Database connection lost");
            self.state = ConnectionState::Lost(message.clone());
        }
        result
    }

    /// 結果セットを返す文を実行
    pub async fn query(&mut self, statement: SqlStatement) -> Result<ResultSet> {
        statement.validate_param_count()?;
        debug!(
            sql = %statement.sql(),
            params = %statement.param_summary(),
            "Executing query"
        );

        let result = {
            let conn = self.connection()?;
            conn.query(&statement).await
        };
        let result_set = self.observe(result)?;

        self.count = result_set.len();
        debug!(rows = self.count, "Query completed");
        Ok(result_set)
    }

    /// 書き込み文を実行
    pub async fn execute(&mut self, statement: SqlStatement) -> Result<ExecuteResult> {
        statement.validate_param_count()?;
        debug!(
            sql = %statement.sql(),
            params = %statement.param_summary(),
            "Executing command"
        );

        let result = {
            let conn = self.connection()?;
            conn.execute(&statement).await
        };
        let execute_result = self.observe(result)?;

        self.affected = execute_result.rows_affected;
        debug!(
            rows_affected = execute_result.rows_affected,
            last_insert_id = ?execute_result.last_insert_id,
            "Command completed"
        );
        Ok(execute_result)
    }

    /// レコードの各フィールドを条件として SELECT
    pub async fn select(&mut self, record: Record, operator: Operator) -> Result<ResultSet> {
        let clean = pipeline::coerce(record)?;
        let statement = SqlStatement::select(clean.require_table()?, clean.columns(), operator)?;
        self.query(statement).await
    }

    /// 条件に一致する行が存在するか
    pub async fn exists(&mut self, record: Record, operator: Operator) -> Result<bool> {
        Ok(!self.select(record, operator).await?.is_empty())
    }

    pub async fn insert(&mut self, record: Record) -> Result<ExecuteResult> {
        let clean = pipeline::coerce(record)?;
        let statement = SqlStatement::insert(clean.require_table()?, clean.columns())?;
        self.execute(statement).await
    }

    /// `contents` の値で `conditions` に一致する行を更新
    ///
    /// テーブル名は `contents` から、無ければ `conditions` から取る。
    pub async fn update(&mut self, contents: Record, conditions: Record) -> Result<ExecuteResult> {
        let contents = pipeline::coerce(contents)?;
        let conditions = pipeline::coerce(conditions)?;
        let table = match contents.table().or(conditions.table()) {
            Some(table) => table,
            None => {
                return Err(Error::Configuration(
                    "Update requires a `table` field".to_string(),
                ))
            }
        };

        let statement = SqlStatement::update(table, contents.columns(), conditions.columns())?;
        self.execute(statement).await
    }

    pub async fn delete(&mut self, conditions: Record) -> Result<ExecuteResult> {
        let clean = pipeline::coerce(conditions)?;
        let table = clean.require_table()?;
        if clean.is_empty() {
            warn!(table = %table, "Delete without conditions removes every row");
        }

        let statement = SqlStatement::delete(table, clean.columns())?;
        self.execute(statement).await
    }

    /// クリーニング後、接続のセッション設定に従ってエスケープした値を返す
    #[cfg(feature = "mysql-backend")]
    pub fn escape(&self, record: Record) -> Result<EscapedRecord> {
        let session = match &self.state {
            ConnectionState::Connected(conn) => conn.session(),
            ConnectionState::Failed(message) | ConnectionState::Lost(message) => {
                return Err(Error::NotConnected(message.clone()))
            }
            ConnectionState::Closed => {
                return Err(Error::NotConnected("Connection closed".to_string()))
            }
        };

        let escaper = SessionEscaper::for_session(session)?;
        pipeline::escape_record(record, &escaper)
    }

    pub async fn ping(&mut self) -> Result<()> {
        let result = {
            let conn = self.connection()?;
            conn.ping().await
        };
        self.observe(result)
    }

    /// 接続を閉じる。接続していないハンドルでは何もしない
    pub async fn close(mut self) -> Result<()> {
        match mem::replace(&mut self.state, ConnectionState::Closed) {
            ConnectionState::Connected(conn) => {
                info!("Closing database connection");
                conn.close().await
            }
            _ => Ok(()),
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.is_connected() {
            debug!("Database handle dropped without close");
        }
    }
}
