//! Database Connection Abstraction Layer
//!
//! ドライバ接続に対する統一インターフェース

use super::statement::SqlStatement;
use super::types::{ExecuteResult, ResultSet, SessionInfo};
use crate::error::Result;
use async_trait::async_trait;

/// データベース接続抽象化トレイト
///
/// 1 つの接続を表す。操作は `&mut self` を取るため同時に 1 つしか実行されない。
/// I/O 障害は `Error::ConnectionLost` として返すこと。
#[async_trait]
pub trait Connection: Send {
    /// SELECTクエリを実行
    async fn query(&mut self, statement: &SqlStatement) -> Result<ResultSet>;

    /// INSERT/UPDATE/DELETEコマンドを実行
    async fn execute(&mut self, statement: &SqlStatement) -> Result<ExecuteResult>;

    /// 接続の健全性をチェック
    async fn ping(&mut self) -> Result<()>;

    /// 接続時に読み取ったセッション情報
    fn session(&self) -> &SessionInfo;

    /// 接続を明示的に閉じる
    async fn close(self: Box<Self>) -> Result<()>;
}
