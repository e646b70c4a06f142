//! Repository trait 定義
//!
//! ルームごとの直近メッセージ履歴を保持するストアへのインターフェース。
//! 具体的な実装（InMemory / Redis）は Infrastructure 層が提供します。

use async_trait::async_trait;

use super::{HistoryError, RoomId};

/// ルームごとに保持する履歴の既定件数
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// History Store trait
///
/// ルームごとの、上限付き・追記専用のメッセージログ。
///
/// ## 不変条件
///
/// - 挿入順 = 発行順
/// - 追記のたびに直近 `limit` 件へ切り詰める（古いものから捨てる）
/// - 追記と切り詰めはストア側でアトミックに行う（複数プロセスから同時に追記しても上限が厳密に守られる）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// シリアライズ済みメッセージを追記し、上限件数に切り詰める
    async fn append(&self, room_id: &RoomId, payload: &str) -> Result<(), HistoryError>;

    /// 保存されている履歴を古い順に取得
    async fn load(&self, room_id: &RoomId) -> Result<Vec<String>, HistoryError>;

    /// 保持する最大件数
    fn limit(&self) -> usize;
}
