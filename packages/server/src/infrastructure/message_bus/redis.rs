//! Redis Pub/Sub を使った MessageBus 実装
//!
//! 発行は共有の多重化接続で行い、購読は 1 件ごとに専用の Pub/Sub 接続を開きます。
//! 購読解除時には `UNSUBSCRIBE` を送ってから接続を破棄します。

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::{MultiplexedConnection, PubSub};

use crate::domain::{BusError, BusSubscription, MessageBus};

/// Redis Pub/Sub を使った MessageBus 実装
#[derive(Clone)]
pub struct RedisMessageBus {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisMessageBus {
    /// # 引数
    ///
    /// - `client`: 購読用の専用接続を開くためのクライアント
    /// - `conn`: 発行に使う共有接続
    pub fn new(client: redis::Client, conn: MultiplexedConnection) -> Self {
        Self { client, conn }
    }
}

#[async_trait]
impl MessageBus for RedisMessageBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(channel, payload)
            .await
            .map_err(|e| BusError::Publish {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(channel, receivers, "Published message");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn BusSubscription>, BusError> {
        let subscribe_error = |e: redis::RedisError| BusError::Subscribe {
            channel: channel.to_string(),
            reason: e.to_string(),
        };

        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(subscribe_error)?;
        pubsub.subscribe(channel).await.map_err(subscribe_error)?;

        Ok(Box::new(RedisSubscription {
            channel: channel.to_string(),
            pubsub: Some(pubsub),
        }))
    }
}

/// Redis Pub/Sub の購読（専用接続を保持する）
struct RedisSubscription {
    channel: String,
    /// 解除後は `None`（接続は解放済み）
    pubsub: Option<PubSub>,
}

#[async_trait]
impl BusSubscription for RedisSubscription {
    async fn next_message(&mut self) -> Option<String> {
        let pubsub = self.pubsub.as_mut()?;
        let stream = pubsub.on_message();
        futures_util::pin_mut!(stream);
        loop {
            let msg = stream.next().await?;
            match msg.get_payload::<String>() {
                Ok(payload) => return Some(payload),
                Err(e) => {
                    tracing::warn!(channel = %self.channel, "Dropping undecodable payload: {}", e);
                }
            }
        }
    }

    async fn unsubscribe(&mut self) -> Result<(), BusError> {
        let Some(mut pubsub) = self.pubsub.take() else {
            return Ok(());
        };
        let result = pubsub.unsubscribe(&self.channel).await;
        // 結果にかかわらず専用接続はここで解放する
        drop(pubsub);

        result.map_err(|e| BusError::Unsubscribe {
            channel: self.channel.clone(),
            reason: e.to_string(),
        })
    }
}
