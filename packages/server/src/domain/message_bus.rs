//! MessageBus trait 定義
//!
//! プロセス間でメッセージを配送する publish/subscribe の抽象化。
//! ルームごとに 1 つの論理チャンネル（`chat:{room_id}`）を使います。

use async_trait::async_trait;

use super::BusError;

/// Message Bus trait
///
/// 必要な契約は publish と subscribe のみ。購読は専用のリソース（接続）を持ち、
/// 呼び出し側が `BusSubscription::unsubscribe` で明示的に解放する。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// チャンネルにペイロードを発行
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BusError>;

    /// チャンネルを購読
    ///
    /// `Ok` が返った時点で購読は有効になっている（以降に発行されたメッセージは取りこぼさない）。
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn BusSubscription>, BusError>;
}

/// 1 チャンネルへの有効な購読
#[async_trait]
pub trait BusSubscription: Send {
    /// 次のメッセージを待つ
    ///
    /// 購読が終了した（接続が切れた等）場合は `None`。
    async fn next_message(&mut self) -> Option<String>;

    /// 購読を解除する
    async fn unsubscribe(&mut self) -> Result<(), BusError>;
}
