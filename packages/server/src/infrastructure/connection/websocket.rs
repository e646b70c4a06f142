//! WebSocket を使った ClientConnection 実装
//!
//! ## 責務
//!
//! - WebSocket 送信タスクへの `UnboundedSender` を保持
//! - クライアントへのメッセージ送信と切断要求
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! UI 層は `WebSocketConnection::channel()` で得た受信側を送信タスクに渡し、
//! この実装は送信側を使ってフレームを積むだけです。
//! これにより、「WebSocket の生成」と「メッセージの送信」が分離されます。

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{ClientConnection, ConnectionError, ConnectionId};

/// 送信タスクに渡すフレーム
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// シリアライズ済みメッセージ
    Text(String),
    /// 接続を閉じる
    Close,
}

/// WebSocket を使った ClientConnection 実装
pub struct WebSocketConnection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<OutboundFrame>,
}

impl WebSocketConnection {
    pub fn new(sender: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self {
            id: ConnectionId::generate(),
            sender,
        }
    }

    /// 接続と、送信タスクが読む受信側を同時に作成
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn push(&self, frame: OutboundFrame) -> Result<(), ConnectionError> {
        self.sender
            .send(frame)
            .map_err(|_| ConnectionError::Closed(self.id.to_string()))
    }
}

#[async_trait]
impl ClientConnection for WebSocketConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send(&self, payload: &str) -> Result<(), ConnectionError> {
        self.push(OutboundFrame::Text(payload.to_string()))
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.push(OutboundFrame::Close)
    }
}
