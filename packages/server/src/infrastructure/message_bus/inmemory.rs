//! InMemory Message Bus 実装
//!
//! チャンネルごとに `tokio::sync::broadcast` を 1 つ持ちます。
//! `Clone` したインスタンスは同じチャンネル表を共有するため、
//! 複数の BroadcastManager（= 複数プロセス相当）で 1 つのバスを共有できます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};

use crate::domain::{BusError, BusSubscription, MessageBus};

/// チャンネルごとのバッファサイズの既定値
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

type Topics = Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>;

/// インメモリ Message Bus 実装
#[derive(Clone)]
pub struct InMemoryMessageBus {
    /// Key: チャンネル名、Value: broadcast sender
    topics: Topics,
    capacity: usize,
}

impl InMemoryMessageBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// チャンネルの現在の購読数
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        let topics = self.topics.lock().await;
        topics
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BusError> {
        let topics = self.topics.lock().await;
        match topics.get(channel) {
            Some(sender) => {
                // 購読者がいなければ Err になるが、Pub/Sub と同じく破棄して問題ない
                let receivers = sender.send(payload.to_string()).unwrap_or(0);
                tracing::debug!(channel, receivers, "Published message");
            }
            None => {
                tracing::debug!(channel, "Published message to channel without subscribers");
            }
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn BusSubscription>, BusError> {
        let mut topics = self.topics.lock().await;
        let receiver = topics
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        Ok(Box::new(InMemorySubscription {
            channel: channel.to_string(),
            receiver: Some(receiver),
            topics: self.topics.clone(),
        }))
    }
}

/// InMemoryMessageBus の購読
struct InMemorySubscription {
    channel: String,
    /// 解除後は `None`
    receiver: Option<broadcast::Receiver<String>>,
    topics: Topics,
}

#[async_trait]
impl BusSubscription for InMemorySubscription {
    async fn next_message(&mut self) -> Option<String> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %self.channel, skipped, "Subscriber lagged behind, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    async fn unsubscribe(&mut self) -> Result<(), BusError> {
        let Some(receiver) = self.receiver.take() else {
            return Ok(());
        };
        drop(receiver);

        let mut topics = self.topics.lock().await;
        if topics
            .get(&self.channel)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            topics.remove(&self.channel);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        // テスト項目: 発行したメッセージが全購読者に届く
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let mut first = bus.subscribe("chat:general").await.unwrap();
        let mut second = bus.subscribe("chat:general").await.unwrap();

        // when (操作):
        bus.publish("chat:general", "hello").await.unwrap();

        // then (期待する結果):
        assert_eq!(first.next_message().await, Some("hello".to_string()));
        assert_eq!(second.next_message().await, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        // テスト項目: 購読者のいないチャンネルへの発行はエラーにならない
        // given (前提条件):
        let bus = InMemoryMessageBus::new();

        // when (操作):
        let result = bus.publish("chat:empty", "hello").await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        // テスト項目: 別チャンネルのメッセージは届かない
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let mut general = bus.subscribe("chat:general").await.unwrap();
        let _random = bus.subscribe("chat:random").await.unwrap();

        // when (操作):
        bus.publish("chat:random", "r1").await.unwrap();
        bus.publish("chat:general", "g1").await.unwrap();

        // then (期待する結果):
        assert_eq!(general.next_message().await, Some("g1".to_string()));
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_channel() {
        // テスト項目: 購読解除で購読数が減り、最後の解除でチャンネルが削除される
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let mut first = bus.subscribe("chat:general").await.unwrap();
        let mut second = bus.subscribe("chat:general").await.unwrap();
        assert_eq!(bus.subscriber_count("chat:general").await, 2);

        // when (操作):
        first.unsubscribe().await.unwrap();

        // then (期待する結果):
        assert_eq!(bus.subscriber_count("chat:general").await, 1);
        second.unsubscribe().await.unwrap();
        assert_eq!(bus.subscriber_count("chat:general").await, 0);
        assert!(first.next_message().await.is_none());
    }

    #[tokio::test]
    async fn test_cloned_bus_shares_channels() {
        // テスト項目: Clone したバス同士でメッセージが配送される（複数プロセス相当）
        // given (前提条件):
        let bus_a = InMemoryMessageBus::new();
        let bus_b = bus_a.clone();
        let mut subscription = bus_b.subscribe("chat:general").await.unwrap();

        // when (操作):
        bus_a.publish("chat:general", "from a").await.unwrap();

        // then (期待する結果):
        assert_eq!(subscription.next_message().await, Some("from a".to_string()));
    }
}
