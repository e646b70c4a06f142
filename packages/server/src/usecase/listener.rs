//! RoomListener
//!
//! アクティブなルームごとに 1 つ起動する長寿命タスク。
//! ルームのバスチャンネルを購読し、届いたメッセージをこのプロセスが保持する
//! そのルームの全接続へファンアウトします。

use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::domain::{BusError, MessageBus, RoomId};

use super::registry::ConnectionRegistry;

/// リスナーの購読状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Readiness {
    /// 購読処理中
    Pending,
    /// 購読が有効になった
    Ready,
    /// 購読に失敗した（リスナーは終了する）
    Failed(BusError),
}

impl Readiness {
    pub(crate) fn is_settled(&self) -> bool {
        !matches!(self, Readiness::Pending)
    }
}

/// 購読状態を待機中の全参加者に伝える
///
/// 購読前にリスナーが終了した場合は、送信側が破棄されることで待機中の参加者に伝わる。
pub(crate) type ReadySignal = watch::Sender<Readiness>;

/// ルームごとのバス購読タスク
pub(crate) struct RoomListener {
    room_id: RoomId,
    bus: Arc<dyn MessageBus>,
    registry: Arc<ConnectionRegistry>,
}

impl RoomListener {
    pub(crate) fn new(
        room_id: RoomId,
        bus: Arc<dyn MessageBus>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            room_id,
            bus,
            registry,
        }
    }

    pub(crate) fn spawn(self, ready: ReadySignal, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(ready, cancel))
    }

    async fn run(self, ready: ReadySignal, cancel: CancellationToken) {
        let channel = self.room_id.channel_name();

        let subscribed = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(room_id = %self.room_id, "Listener cancelled before subscribing");
                return;
            }
            result = self.bus.subscribe(&channel) => result,
        };
        let mut subscription = match subscribed {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!(room_id = %self.room_id, "Listener failed to subscribe: {}", e);
                // 失敗を通知する前に閉じるので、通知後に入室した接続は対象にならない
                self.close_stranded().await;
                ready.send_replace(Readiness::Failed(e));
                return;
            }
        };

        tracing::info!(room_id = %self.room_id, channel = %channel, "Listener subscribed");
        ready.send_replace(Readiness::Ready);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = subscription.next_message() => match next {
                    Some(payload) => {
                        self.fan_out(&payload).await;
                    }
                    None => {
                        tracing::warn!(room_id = %self.room_id, "Bus closed the subscription");
                        break;
                    }
                },
            }
        }

        if let Err(e) = subscription.unsubscribe().await {
            tracing::warn!(room_id = %self.room_id, "Failed to unsubscribe cleanly: {}", e);
        }
        drop(subscription);
        tracing::info!(room_id = %self.room_id, "Listener stopped");
    }

    /// 購読に失敗したルームの接続を閉じる
    ///
    /// 待機中の参加者はエラーを受け取って自分で登録解除する。待機がタイムアウト済みの
    /// 参加者はクローズによってセッションが終わり、リスナーのないルームに残らない。
    async fn close_stranded(&self) -> usize {
        let connections = self.registry.snapshot(&self.room_id).await;
        for connection in &connections {
            if let Err(e) = connection.close().await {
                tracing::debug!(
                    room_id = %self.room_id,
                    connection_id = %connection.id(),
                    "Connection was already closed: {}",
                    e
                );
            }
        }
        if !connections.is_empty() {
            tracing::warn!(
                room_id = %self.room_id,
                closed = connections.len(),
                "Closed connections left without a room listener"
            );
        }
        connections.len()
    }

    /// 現在の接続のスナップショットへ配送する
    ///
    /// 1 接続への送信失敗は他の接続への配送を中断しない。
    ///
    /// # Returns
    ///
    /// 配送に成功した接続数
    async fn fan_out(&self, payload: &str) -> usize {
        let connections = self.registry.snapshot(&self.room_id).await;
        let mut delivered = 0;
        for connection in connections {
            match connection.send(payload).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        room_id = %self.room_id,
                        connection_id = %connection.id(),
                        "Failed to deliver message: {}",
                        e
                    );
                }
            }
        }
        tracing::debug!(room_id = %self.room_id, delivered, "Fanned out message");
        delivered
    }
}
