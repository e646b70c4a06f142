//! BroadcastManager
//!
//! 接続・ブロードキャスト管理のファサード。トランスポート層（WebSocket エンドポイント）に
//! `connect` / `disconnect` / `broadcast` / `history` を提供します。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 入室時の履歴再生（順序、ライブメッセージより先に届くこと）
//! - 履歴の上限（直近 50 件）
//! - バスを共有する 2 つのインスタンス（= 2 プロセス）間の配送
//! - 同時入室時にリスナーが 1 つだけ起動されること
//! - 最後の退室でルームとリスナーが破棄され、再入室で作り直されること
//! - バス・ストア障害が呼び出し元にエラーとして返ること
//!
//! ### どのような状況を想定しているか
//! - 正常系：入室・送信・退室
//! - 異常系：履歴ストア障害、バス障害
//! - エッジケース：同一ユーザーの再接続、同時入室

use std::{sync::Arc, time::Duration};

use crate::domain::{
    ChatMessage, ClientConnection, ConnectionId, HistoryStore, MessageBus, RoomId, UserId,
};

use super::{
    error::BroadcastError,
    lifecycle::{DEFAULT_READY_TIMEOUT, ListenerStart, RoomLifecycleCoordinator},
    registry::{ConnectionRegistry, RemoveOutcome},
};

/// BroadcastManager の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastSettings {
    /// 入室時に購読完了を待つ上限
    pub ready_timeout: Duration,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

/// ローカルでアクティブなルームの状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatus {
    pub room_id: RoomId,
    pub connections: usize,
    pub listening: bool,
}

/// 接続・ブロードキャスト管理のファサード
pub struct BroadcastManager {
    history: Arc<dyn HistoryStore>,
    bus: Arc<dyn MessageBus>,
    registry: Arc<ConnectionRegistry>,
    lifecycle: RoomLifecycleCoordinator,
}

impl BroadcastManager {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        history: Arc<dyn HistoryStore>,
        settings: BroadcastSettings,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let lifecycle =
            RoomLifecycleCoordinator::new(bus.clone(), registry.clone(), settings.ready_timeout);
        Self {
            history,
            bus,
            registry,
            lifecycle,
        }
    }

    /// クライアントをルームに接続する
    ///
    /// 1. 履歴を保存順に `connection` へ再生する
    /// 2. レジストリに登録する（同じユーザーの古い接続は閉じられる）
    /// 3. ルームのリスナーを起動し、新規起動なら購読完了を待つ
    ///
    /// 履歴の再生が終わるまで登録しないため、クライアントは履歴を必ずライブメッセージより先に受け取る。
    ///
    /// # Errors
    ///
    /// - 履歴の読み出しに失敗した場合
    /// - 履歴の送信に失敗した場合（接続は登録されない）
    /// - リスナーの購読に失敗した場合（接続は登録解除される）
    pub async fn connect(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        connection: Arc<dyn ClientConnection>,
    ) -> Result<(), BroadcastError> {
        let history = self.history.load(room_id).await?;
        for entry in &history {
            connection.send(entry).await?;
        }
        tracing::debug!(
            room_id = %room_id,
            user_id = %user_id,
            replayed = history.len(),
            "Replayed history"
        );

        let connection_id = connection.id();
        self.registry
            .add(room_id.clone(), user_id.clone(), connection)
            .await;

        match self.lifecycle.ensure_listener(room_id).await {
            Ok(start) => {
                if start == ListenerStart::Subscribed {
                    tracing::debug!(room_id = %room_id, "Room listener is ready");
                }
                tracing::info!(room_id = %room_id, user_id = %user_id, "Connected");
                Ok(())
            }
            Err(e) => {
                self.disconnect_connection(room_id, user_id, connection_id)
                    .await;
                Err(e.into())
            }
        }
    }

    /// (room, user) の接続を登録解除する
    ///
    /// ルームが空になった場合はリスナーを停止する。
    pub async fn disconnect(&self, room_id: &RoomId, user_id: &UserId) -> RemoveOutcome {
        let outcome = self.registry.remove(room_id, user_id).await;
        self.after_remove(room_id, user_id, outcome).await
    }

    /// `connection_id` の接続がまだ登録されている場合だけ登録解除する
    ///
    /// 新しい接続に置き換えられた古い接続の後始末に使う。
    pub async fn disconnect_connection(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> RemoveOutcome {
        let outcome = self
            .registry
            .remove_connection(room_id, user_id, connection_id)
            .await;
        self.after_remove(room_id, user_id, outcome).await
    }

    async fn after_remove(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        outcome: RemoveOutcome,
    ) -> RemoveOutcome {
        match outcome {
            RemoveOutcome::Removed { room_emptied } => {
                tracing::info!(room_id = %room_id, user_id = %user_id, "Disconnected");
                if room_emptied {
                    self.lifecycle.release_if_idle(room_id).await;
                }
            }
            RemoveOutcome::NotFound => {
                tracing::debug!(room_id = %room_id, user_id = %user_id, "No registered connection to remove");
            }
        }
        outcome
    }

    /// メッセージを履歴に追記し、ルームのチャンネルへ発行する
    ///
    /// ローカルの接続にも直接は送らず、必ずバス経由で配送する。
    /// これにより全プロセス（自プロセスを含む）がルームごとに同じ順序でメッセージを受け取る。
    pub async fn broadcast(
        &self,
        room_id: &RoomId,
        message: &ChatMessage,
    ) -> Result<(), BroadcastError> {
        let payload = message.to_json()?;
        self.history.append(room_id, &payload).await?;
        self.bus
            .publish(&room_id.channel_name(), &payload)
            .await?;
        Ok(())
    }

    /// ルームの履歴（シリアライズ済み、古い順）
    pub async fn history(&self, room_id: &RoomId) -> Result<Vec<String>, BroadcastError> {
        Ok(self.history.load(room_id).await?)
    }

    /// このプロセスでアクティブなルームの一覧
    pub async fn active_rooms(&self) -> Vec<RoomStatus> {
        let mut statuses = Vec::new();
        for (room_id, connections) in self.registry.rooms().await {
            let listening = self.lifecycle.is_listening(&room_id).await;
            statuses.push(RoomStatus {
                room_id,
                connections,
                listening,
            });
        }
        statuses
    }

    /// (room, user) の接続が登録されているか
    pub async fn is_connected(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.registry.contains(room_id, user_id).await
    }

    pub async fn is_listening(&self, room_id: &RoomId) -> bool {
        self.lifecycle.is_listening(room_id).await
    }

    pub async fn listener_count(&self) -> usize {
        self.lifecycle.listener_count().await
    }

    /// 購読完了待ちがタイムアウトした累計回数
    pub fn ready_timeouts(&self) -> u64 {
        self.lifecycle.ready_timeouts()
    }

    /// 全ルームのリスナーを停止する（プロセス終了時）
    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{BusError, HistoryError, MessageKind, MockHistoryStore, MockMessageBus, Username},
        infrastructure::{
            connection::{OutboundFrame, WebSocketConnection},
            history::InMemoryHistoryStore,
            message_bus::InMemoryMessageBus,
        },
    };
    use tokio::sync::mpsc::UnboundedReceiver;
    use tsudoi_shared::time::{Clock, FixedClock};

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn text_message(user_id: &str, text: &str) -> ChatMessage {
        ChatMessage::from_user(
            user(user_id),
            Username::new(user_id.to_string()).unwrap(),
            text,
            FixedClock::from_millis(1_704_067_200_000).now(),
        )
    }

    fn create_manager(bus: &InMemoryMessageBus, store: &Arc<InMemoryHistoryStore>) -> BroadcastManager {
        BroadcastManager::new(
            Arc::new(bus.clone()),
            store.clone(),
            BroadcastSettings::default(),
        )
    }

    async fn recv_message(rx: &mut UnboundedReceiver<OutboundFrame>) -> ChatMessage {
        match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Some(OutboundFrame::Text(text))) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    async fn assert_no_frame(rx: &mut UnboundedReceiver<OutboundFrame>) {
        let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(!matches!(result, Ok(Some(_))), "unexpected frame: {:?}", result);
    }

    #[tokio::test]
    async fn test_connect_replays_history_before_live_messages() {
        // テスト項目: 入室時に履歴が保存順に届き、その後にライブメッセージが届く
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let store = Arc::new(InMemoryHistoryStore::new());
        let manager = create_manager(&bus, &store);
        for text in ["m1", "m2", "m3"] {
            manager
                .broadcast(&room("general"), &text_message("alice", text))
                .await
                .unwrap();
        }

        // when (操作):
        let (bob, mut bob_rx) = WebSocketConnection::channel();
        manager
            .connect(&room("general"), &user("bob"), Arc::new(bob))
            .await
            .unwrap();
        manager
            .broadcast(&room("general"), &text_message("alice", "m4"))
            .await
            .unwrap();

        // then (期待する結果):
        for expected in ["m1", "m2", "m3", "m4"] {
            assert_eq!(recv_message(&mut bob_rx).await.text(), expected);
        }
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_history_keeps_fifty_most_recent() {
        // テスト項目: 51 件以上ブロードキャストすると直近 50 件が発行順に残る
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let store = Arc::new(InMemoryHistoryStore::new());
        let manager = create_manager(&bus, &store);

        // when (操作):
        for i in 0..60 {
            manager
                .broadcast(&room("general"), &text_message("alice", &format!("m{}", i)))
                .await
                .unwrap();
        }

        // then (期待する結果):
        let history = manager.history(&room("general")).await.unwrap();
        assert_eq!(history.len(), 50);
        let texts: Vec<String> = history
            .iter()
            .map(|entry| serde_json::from_str::<ChatMessage>(entry).unwrap().text().to_string())
            .collect();
        let expected: Vec<String> = (10..60).map(|i| format!("m{}", i)).collect();
        assert_eq!(texts, expected);
    }

    #[tokio::test]
    async fn test_two_processes_sharing_bus_converge() {
        // テスト項目: 同じバスとストアを共有する 2 つのマネージャー間でメッセージが届く
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let store = Arc::new(InMemoryHistoryStore::new());
        let process_a = create_manager(&bus, &store);
        let process_b = create_manager(&bus, &store);

        let (alice, mut alice_rx) = WebSocketConnection::channel();
        let (bob, mut bob_rx) = WebSocketConnection::channel();
        process_a
            .connect(&room("general"), &user("alice"), Arc::new(alice))
            .await
            .unwrap();
        process_b
            .connect(&room("general"), &user("bob"), Arc::new(bob))
            .await
            .unwrap();

        // when (操作):
        process_a
            .broadcast(&room("general"), &text_message("alice", "hi from a"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(recv_message(&mut bob_rx).await.text(), "hi from a");
        assert_eq!(recv_message(&mut alice_rx).await.text(), "hi from a");
        assert_eq!(bus.subscriber_count("chat:general").await, 2);

        process_a.shutdown().await;
        process_b.shutdown().await;
    }

    #[tokio::test]
    async fn test_concurrent_joins_start_single_listener() {
        // テスト項目: 同時に入室しても、ルームのリスナーは 1 つだけ起動される
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let store = Arc::new(InMemoryHistoryStore::new());
        let manager = Arc::new(create_manager(&bus, &store));

        // when (操作):
        let mut joins = Vec::new();
        let mut receivers = Vec::new();
        for i in 0..10 {
            let (connection, rx) = WebSocketConnection::channel();
            receivers.push(rx);
            let manager = manager.clone();
            joins.push(tokio::spawn(async move {
                manager
                    .connect(&room("general"), &user(&format!("user-{}", i)), Arc::new(connection))
                    .await
            }));
        }
        for join in joins {
            join.await.unwrap().unwrap();
        }

        // then (期待する結果):
        assert_eq!(manager.listener_count().await, 1);
        assert_eq!(bus.subscriber_count("chat:general").await, 1);
        let rooms = manager.active_rooms().await;
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].connections, 10);
        assert!(rooms[0].listening);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_last_disconnect_tears_down_room_and_rejoin_recreates() {
        // テスト項目: 最後の退室でルームとリスナーが破棄され、再入室で作り直される
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let store = Arc::new(InMemoryHistoryStore::new());
        let manager = create_manager(&bus, &store);
        let (alice, _alice_rx) = WebSocketConnection::channel();
        let (bob, _bob_rx) = WebSocketConnection::channel();
        manager.connect(&room("general"), &user("alice"), Arc::new(alice)).await.unwrap();
        manager.connect(&room("general"), &user("bob"), Arc::new(bob)).await.unwrap();

        // when (操作):
        let first = manager.disconnect(&room("general"), &user("alice")).await;
        let still_listening = manager.is_listening(&room("general")).await;
        let second = manager.disconnect(&room("general"), &user("bob")).await;

        // then (期待する結果):
        assert_eq!(first, RemoveOutcome::Removed { room_emptied: false });
        assert!(still_listening);
        assert_eq!(second, RemoveOutcome::Removed { room_emptied: true });
        assert!(manager.active_rooms().await.is_empty());
        assert!(!manager.is_listening(&room("general")).await);
        assert_eq!(bus.subscriber_count("chat:general").await, 0);

        // 再入室でルームとリスナーが作り直される
        let (carol, mut carol_rx) = WebSocketConnection::channel();
        manager.connect(&room("general"), &user("carol"), Arc::new(carol)).await.unwrap();
        assert!(manager.is_listening(&room("general")).await);
        assert_eq!(bus.subscriber_count("chat:general").await, 1);
        manager
            .broadcast(&room("general"), &text_message("carol", "back again"))
            .await
            .unwrap();
        assert_eq!(recv_message(&mut carol_rx).await.text(), "back again");

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconnect_supersedes_previous_connection() {
        // テスト項目: 同じユーザーの再接続で古い接続が閉じられ、古い接続の後始末は新しい接続に影響しない
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let store = Arc::new(InMemoryHistoryStore::new());
        let manager = create_manager(&bus, &store);
        let (old, mut old_rx) = WebSocketConnection::channel();
        let old_id = old.id();
        manager.connect(&room("general"), &user("alice"), Arc::new(old)).await.unwrap();

        // when (操作):
        let (new, mut new_rx) = WebSocketConnection::channel();
        manager.connect(&room("general"), &user("alice"), Arc::new(new)).await.unwrap();
        let stale = manager
            .disconnect_connection(&room("general"), &user("alice"), old_id)
            .await;
        manager
            .broadcast(&room("general"), &text_message("alice", "still here"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(old_rx.recv().await, Some(OutboundFrame::Close));
        assert_eq!(stale, RemoveOutcome::NotFound);
        assert!(manager.is_connected(&room("general"), &user("alice")).await);
        assert_eq!(recv_message(&mut new_rx).await.text(), "still here");
        assert_no_frame(&mut old_rx).await;

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_affect_other_connections() {
        // テスト項目: 1 接続への配送失敗が他の接続への配送やリスナーに影響しない
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let store = Arc::new(InMemoryHistoryStore::new());
        let manager = create_manager(&bus, &store);
        let (broken, broken_rx) = WebSocketConnection::channel();
        let (alice, mut alice_rx) = WebSocketConnection::channel();
        manager.connect(&room("general"), &user("broken"), Arc::new(broken)).await.unwrap();
        manager.connect(&room("general"), &user("alice"), Arc::new(alice)).await.unwrap();
        drop(broken_rx);

        // when (操作):
        manager
            .broadcast(&room("general"), &text_message("alice", "first"))
            .await
            .unwrap();
        manager
            .broadcast(&room("general"), &text_message("alice", "second"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(recv_message(&mut alice_rx).await.text(), "first");
        assert_eq!(recv_message(&mut alice_rx).await.text(), "second");
        assert!(manager.is_listening(&room("general")).await);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_connect_fails_when_history_store_is_down() {
        // テスト項目: 履歴ストアの障害は connect のエラーとして返り、接続は登録されない
        // given (前提条件):
        let mut store = MockHistoryStore::new();
        store
            .expect_load()
            .returning(|_| Err(HistoryError::Unavailable("connection refused".to_string())));
        let manager = BroadcastManager::new(
            Arc::new(InMemoryMessageBus::new()),
            Arc::new(store),
            BroadcastSettings::default(),
        );
        let (alice, _rx) = WebSocketConnection::channel();

        // when (操作):
        let result = manager
            .connect(&room("general"), &user("alice"), Arc::new(alice))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(BroadcastError::History(_))));
        assert!(!manager.is_connected(&room("general"), &user("alice")).await);
        assert_eq!(manager.listener_count().await, 0);
    }

    #[tokio::test]
    async fn test_connect_rolls_back_when_subscription_fails() {
        // テスト項目: リスナーの購読失敗は connect のエラーとして返り、接続とルームは残らない
        // given (前提条件):
        let mut bus = MockMessageBus::new();
        bus.expect_subscribe().returning(|channel| {
            Err(BusError::Subscribe {
                channel: channel.to_string(),
                reason: "connection refused".to_string(),
            })
        });
        let manager = BroadcastManager::new(
            Arc::new(bus),
            Arc::new(InMemoryHistoryStore::new()),
            BroadcastSettings::default(),
        );
        let (alice, _rx) = WebSocketConnection::channel();

        // when (操作):
        let result = manager
            .connect(&room("general"), &user("alice"), Arc::new(alice))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(BroadcastError::Bus(_))));
        assert!(manager.active_rooms().await.is_empty());
        assert_eq!(manager.listener_count().await, 0);
    }

    /// 一定時間後に購読に失敗するバス
    struct SlowFailingBus {
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl MessageBus for SlowFailingBus {
        async fn publish(&self, _channel: &str, _payload: &str) -> Result<(), BusError> {
            Ok(())
        }

        async fn subscribe(
            &self,
            channel: &str,
        ) -> Result<Box<dyn crate::domain::BusSubscription>, BusError> {
            tokio::time::sleep(self.delay).await;
            Err(BusError::Subscribe {
                channel: channel.to_string(),
                reason: "refused".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_joiner_during_failing_subscription_is_rolled_back_too() {
        // テスト項目: 購読処理中に入室した 2 人目も購読失敗をエラーとして受け取り、リスナーのないルームに残らない
        // given (前提条件):
        let manager = Arc::new(BroadcastManager::new(
            Arc::new(SlowFailingBus {
                delay: Duration::from_millis(200),
            }),
            Arc::new(InMemoryHistoryStore::new()),
            BroadcastSettings::default(),
        ));
        let (alice, mut alice_rx) = WebSocketConnection::channel();
        let (bob, mut bob_rx) = WebSocketConnection::channel();

        // when (操作):
        let alice_join = {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .connect(&room("general"), &user("alice"), Arc::new(alice))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let bob_result = manager
            .connect(&room("general"), &user("bob"), Arc::new(bob))
            .await;
        let alice_result = alice_join.await.unwrap();

        // then (期待する結果):
        assert!(matches!(alice_result, Err(BroadcastError::Bus(BusError::Subscribe { .. }))));
        assert!(matches!(bob_result, Err(BroadcastError::Bus(BusError::Subscribe { .. }))));
        assert!(!manager.is_connected(&room("general"), &user("alice")).await);
        assert!(!manager.is_connected(&room("general"), &user("bob")).await);
        assert!(manager.active_rooms().await.is_empty());
        assert_eq!(manager.listener_count().await, 0);
        // 両方の接続にはクローズが送られている
        assert_eq!(alice_rx.recv().await, Some(OutboundFrame::Close));
        assert_eq!(bob_rx.recv().await, Some(OutboundFrame::Close));
    }

    #[tokio::test]
    async fn test_timed_out_joiner_is_closed_when_subscription_fails() {
        // テスト項目: 購読完了待ちがタイムアウトした後に購読が失敗した場合、その接続は閉じられる
        // given (前提条件):
        let manager = BroadcastManager::new(
            Arc::new(SlowFailingBus {
                delay: Duration::from_millis(200),
            }),
            Arc::new(InMemoryHistoryStore::new()),
            BroadcastSettings {
                ready_timeout: Duration::from_millis(50),
            },
        );
        let (alice, mut alice_rx) = WebSocketConnection::channel();

        // when (操作):
        let result = manager
            .connect(&room("general"), &user("alice"), Arc::new(alice))
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(manager.ready_timeouts(), 1);
        let frame = tokio::time::timeout(Duration::from_secs(2), alice_rx.recv())
            .await
            .unwrap();
        assert_eq!(frame, Some(OutboundFrame::Close));
    }

    #[tokio::test]
    async fn test_broadcast_fails_when_publish_fails() {
        // テスト項目: 発行の失敗は broadcast のエラーとして返る（履歴には追記済み）
        // given (前提条件):
        let mut bus = MockMessageBus::new();
        bus.expect_publish().returning(|channel, _| {
            Err(BusError::Publish {
                channel: channel.to_string(),
                reason: "broken pipe".to_string(),
            })
        });
        let store = Arc::new(InMemoryHistoryStore::new());
        let manager = BroadcastManager::new(Arc::new(bus), store.clone(), BroadcastSettings::default());

        // when (操作):
        let result = manager
            .broadcast(&room("general"), &text_message("alice", "hello"))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(BroadcastError::Bus(BusError::Publish { .. }))));
        assert_eq!(manager.history(&room("general")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publisher_receives_own_message_through_bus() {
        // テスト項目: 送信者自身もバス経由で自分のメッセージを受け取る
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let store = Arc::new(InMemoryHistoryStore::new());
        let manager = create_manager(&bus, &store);
        let (alice, mut alice_rx) = WebSocketConnection::channel();
        manager.connect(&room("general"), &user("alice"), Arc::new(alice)).await.unwrap();

        // when (操作):
        manager
            .broadcast(&room("general"), &text_message("alice", "echo"))
            .await
            .unwrap();

        // then (期待する結果):
        let received = recv_message(&mut alice_rx).await;
        assert_eq!(received.kind(), MessageKind::Message);
        assert_eq!(received.user_id(), Some(&user("alice")));
        assert_eq!(received.text(), "echo");

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_all_listeners() {
        // テスト項目: shutdown で全ルームのリスナーが停止し、購読が解除される
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let store = Arc::new(InMemoryHistoryStore::new());
        let manager = create_manager(&bus, &store);
        let (alice, _a) = WebSocketConnection::channel();
        let (bob, _b) = WebSocketConnection::channel();
        manager.connect(&room("general"), &user("alice"), Arc::new(alice)).await.unwrap();
        manager.connect(&room("random"), &user("bob"), Arc::new(bob)).await.unwrap();
        assert_eq!(manager.listener_count().await, 2);

        // when (操作):
        manager.shutdown().await;

        // then (期待する結果):
        assert_eq!(manager.listener_count().await, 0);
        assert_eq!(bus.subscriber_count("chat:general").await, 0);
        assert_eq!(bus.subscriber_count("chat:random").await, 0);
    }
}
