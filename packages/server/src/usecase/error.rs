//! UseCase layer errors

use thiserror::Error;

use crate::domain::{BusError, ConnectionError, HistoryError};

/// BroadcastManager と各ユースケースのエラー
///
/// バス・ストアへの接続障害はここでは回復せず、呼び出し元にそのまま返す。
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("failed to replay history: {0}")]
    Replay(#[from] ConnectionError),

    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}
