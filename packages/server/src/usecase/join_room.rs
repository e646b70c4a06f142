//! UseCase: 入室処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - 接続後に入室通知がルーム全体（本人を含む）へ配送されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：空のルームへの入室、既存のルームへの入室
//! - 異常系：入室通知の発行失敗（接続をロールバック）

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{ChatMessage, ClientConnection, RoomId, UserId, Username};

use super::{BroadcastError, BroadcastManager};

/// 入室のユースケース
pub struct JoinRoomUseCase {
    manager: Arc<BroadcastManager>,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
    pub fn new(manager: Arc<BroadcastManager>, clock: Arc<dyn Clock>) -> Self {
        Self { manager, clock }
    }

    /// 入室を実行
    ///
    /// # Arguments
    ///
    /// * `connection` - 履歴とライブメッセージの送信先
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 入室完了（履歴の再生と入室通知の発行が済んでいる）
    /// * `Err(BroadcastError)` - 入室失敗（接続は登録されていない）
    pub async fn execute(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        username: &Username,
        connection: Arc<dyn ClientConnection>,
    ) -> Result<(), BroadcastError> {
        let connection_id = connection.id();
        self.manager.connect(room_id, user_id, connection).await?;

        let joined = ChatMessage::joined(username, self.clock.now());
        if let Err(e) = self.manager.broadcast(room_id, &joined).await {
            self.manager
                .disconnect_connection(room_id, user_id, connection_id)
                .await;
            return Err(e);
        }

        tracing::info!(room_id = %room_id, user_id = %user_id, "Joined room");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{BusError, BusSubscription, MessageBus, MessageKind},
        infrastructure::{
            connection::{OutboundFrame, WebSocketConnection},
            history::InMemoryHistoryStore,
            message_bus::InMemoryMessageBus,
        },
        usecase::BroadcastSettings,
    };
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tsudoi_shared::time::FixedClock;

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn name(value: &str) -> Username {
        Username::new(value.to_string()).unwrap()
    }

    async fn recv_message(rx: &mut UnboundedReceiver<OutboundFrame>) -> ChatMessage {
        match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Some(OutboundFrame::Text(text))) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    fn create_usecase(bus: Arc<dyn MessageBus>) -> (JoinRoomUseCase, Arc<BroadcastManager>) {
        let manager = Arc::new(BroadcastManager::new(
            bus,
            Arc::new(InMemoryHistoryStore::new()),
            BroadcastSettings::default(),
        ));
        let clock = Arc::new(FixedClock::from_millis(1_704_067_200_000));
        (JoinRoomUseCase::new(manager.clone(), clock), manager)
    }

    #[tokio::test]
    async fn test_join_broadcasts_joined_notice() {
        // テスト項目: 入室すると本人と既存の参加者に入室通知が届く
        // given (前提条件):
        let (usecase, manager) = create_usecase(Arc::new(InMemoryMessageBus::new()));
        let (alice, mut alice_rx) = WebSocketConnection::channel();
        usecase
            .execute(&room("general"), &user("a-1"), &name("alice"), Arc::new(alice))
            .await
            .unwrap();
        assert_eq!(recv_message(&mut alice_rx).await.text(), "alice joined the chat");

        // when (操作):
        let (bob, mut bob_rx) = WebSocketConnection::channel();
        usecase
            .execute(&room("general"), &user("b-1"), &name("bob"), Arc::new(bob))
            .await
            .unwrap();

        // then (期待する結果):
        // bob には alice の入室通知が履歴として先に届く
        assert_eq!(recv_message(&mut bob_rx).await.text(), "alice joined the chat");
        let notice = recv_message(&mut bob_rx).await;
        assert_eq!(notice.kind(), MessageKind::System);
        assert_eq!(notice.text(), "bob joined the chat");
        assert_eq!(notice.timestamp().timestamp_millis(), 1_704_067_200_000);
        assert_eq!(recv_message(&mut alice_rx).await.text(), "bob joined the chat");
        assert_eq!(manager.listener_count().await, 1);

        manager.shutdown().await;
    }

    /// 購読はできるが発行に失敗するバス
    struct PublishFailingBus(InMemoryMessageBus);

    #[async_trait::async_trait]
    impl MessageBus for PublishFailingBus {
        async fn publish(&self, channel: &str, _payload: &str) -> Result<(), BusError> {
            Err(BusError::Publish {
                channel: channel.to_string(),
                reason: "read-only replica".to_string(),
            })
        }

        async fn subscribe(&self, channel: &str) -> Result<Box<dyn BusSubscription>, BusError> {
            self.0.subscribe(channel).await
        }
    }

    #[tokio::test]
    async fn test_join_rolls_back_when_notice_cannot_be_published() {
        // テスト項目: 入室通知の発行に失敗した場合、接続は登録解除されエラーが返る
        // given (前提条件):
        let (usecase, manager) = create_usecase(Arc::new(PublishFailingBus(InMemoryMessageBus::new())));
        let (alice, _alice_rx) = WebSocketConnection::channel();

        // when (操作):
        let result = usecase
            .execute(&room("general"), &user("a-1"), &name("alice"), Arc::new(alice))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(BroadcastError::Bus(_))));
        assert!(!manager.is_connected(&room("general"), &user("a-1")).await);
        assert_eq!(manager.listener_count().await, 0);
    }
}
