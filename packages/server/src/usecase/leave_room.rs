//! UseCase: 退室処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveRoomUseCase::execute() メソッド
//! - 正常な切断時だけ退室通知が配送されること
//!
//! ### なぜこのテストが必要か
//! - 正常な切断（退室通知あり）と予期しないエラー（退室通知なし）の扱いが非対称であるため
//! - 置き換えられた古い接続の後始末で、まだ在室しているユーザーの退室通知を出さないため
//!
//! ### どのような状況を想定しているか
//! - 正常系：クライアントの切断
//! - 異常系：トランスポートエラー
//! - エッジケース：置き換え済みの古い接続の終了

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{ChatMessage, ConnectionId, RoomId, UserId, Username};

use super::{BroadcastError, BroadcastManager, RemoveOutcome};

/// 退室の理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    /// クライアントが切断した（正常な退室として扱う）
    Disconnected,
    /// 予期しないトランスポートエラー（退室通知は出さない）
    Failed,
}

/// 退室のユースケース
pub struct LeaveRoomUseCase {
    manager: Arc<BroadcastManager>,
    clock: Arc<dyn Clock>,
}

impl LeaveRoomUseCase {
    pub fn new(manager: Arc<BroadcastManager>, clock: Arc<dyn Clock>) -> Self {
        Self { manager, clock }
    }

    /// 退室を実行
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - 退室通知を発行した
    /// * `Ok(false)` - 退室通知は発行していない（エラー経路、または置き換え済みの接続）
    /// * `Err(BroadcastError)` - 退室通知の発行に失敗した（登録解除は済んでいる）
    pub async fn execute(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        username: &Username,
        connection_id: ConnectionId,
        reason: LeaveReason,
    ) -> Result<bool, BroadcastError> {
        let outcome = self
            .manager
            .disconnect_connection(room_id, user_id, connection_id)
            .await;

        match (outcome, reason) {
            (RemoveOutcome::Removed { .. }, LeaveReason::Disconnected) => {
                let left = ChatMessage::left(username, self.clock.now());
                self.manager.broadcast(room_id, &left).await?;
                tracing::info!(room_id = %room_id, user_id = %user_id, "Left room");
                Ok(true)
            }
            (RemoveOutcome::Removed { .. }, LeaveReason::Failed) => {
                tracing::info!(room_id = %room_id, user_id = %user_id, "Dropped connection after error");
                Ok(false)
            }
            (RemoveOutcome::NotFound, _) => Ok(false),
        }
    }
}
