//! ClientConnection trait 定義
//!
//! ローカルに接続しているクライアント（WebSocket など）への送信口の抽象化。

use async_trait::async_trait;

use super::{ConnectionError, ConnectionId};

/// Client Connection trait
///
/// ConnectionRegistry が保持する「送信ハンドル」。トランスポートの生成は UI 層が行い、
/// この trait の実装（Infrastructure 層）が送信と切断を担当する。
#[async_trait]
pub trait ClientConnection: Send + Sync {
    /// この接続の ID
    fn id(&self) -> ConnectionId;

    /// シリアライズ済みメッセージを送信
    async fn send(&self, payload: &str) -> Result<(), ConnectionError>;

    /// 接続を閉じる
    async fn close(&self) -> Result<(), ConnectionError>;
}
