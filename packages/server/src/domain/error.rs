//! Domain errors

use thiserror::Error;

/// 値オブジェクト生成時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} is too long ({length} chars, max {max})")]
    TooLong {
        field: &'static str,
        max: usize,
        length: usize,
    },
}

/// 履歴ストアのエラー
#[derive(Debug, Error)]
pub enum HistoryError {
    /// ストアに到達できない、またはコマンドが失敗した
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

/// メッセージバスのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("failed to publish to '{channel}': {reason}")]
    Publish { channel: String, reason: String },

    #[error("failed to subscribe to '{channel}': {reason}")]
    Subscribe { channel: String, reason: String },

    #[error("failed to unsubscribe from '{channel}': {reason}")]
    Unsubscribe { channel: String, reason: String },
}

/// クライアント接続への送信エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("connection {0} is closed")]
    Closed(String),
}
