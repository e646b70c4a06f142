//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 送信者情報と発行時刻を持つメッセージがルーム全体に配送されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージ送信
//! - エッジケース：空文字列のメッセージ

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{ChatMessage, RoomId, UserId, Username};

use super::{BroadcastError, BroadcastManager};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    manager: Arc<BroadcastManager>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(manager: Arc<BroadcastManager>, clock: Arc<dyn Clock>) -> Self {
        Self { manager, clock }
    }

    /// メッセージ送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok(ChatMessage)` - 発行したメッセージ
    /// * `Err(BroadcastError)` - 履歴ストアまたはバスの障害
    pub async fn execute(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        username: &Username,
        text: String,
    ) -> Result<ChatMessage, BroadcastError> {
        let message = ChatMessage::from_user(
            user_id.clone(),
            username.clone(),
            text,
            self.clock.now(),
        );
        self.manager.broadcast(room_id, &message).await?;
        tracing::debug!(room_id = %room_id, user_id = %user_id, "Message broadcast");
        Ok(message)
    }
}
