//! InMemory History Store 実装
//!
//! ドメイン層が定義する HistoryStore trait の具体的な実装。
//! ルームごとの `VecDeque` をインメモリ DB として使用します。
//! 追記と切り詰めは同じロックの中で行うため、常に上限件数が守られます。

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{DEFAULT_HISTORY_LIMIT, HistoryError, HistoryStore, RoomId};

/// インメモリ History Store 実装
pub struct InMemoryHistoryStore {
    /// Key: ルーム ID、Value: シリアライズ済みメッセージ（古い順）
    logs: Mutex<HashMap<RoomId, VecDeque<String>>>,
    /// ルームごとの最大件数
    limit: usize,
}

impl InMemoryHistoryStore {
    /// 既定の上限（50 件）で作成
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// 上限件数を指定して作成
    pub fn with_limit(limit: usize) -> Self {
        Self {
            logs: Mutex::new(HashMap::new()),
            limit,
        }
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, room_id: &RoomId, payload: &str) -> Result<(), HistoryError> {
        let mut logs = self.logs.lock().await;
        let log = logs.entry(room_id.clone()).or_default();
        log.push_back(payload.to_string());
        while log.len() > self.limit {
            log.pop_front();
        }
        Ok(())
    }

    async fn load(&self, room_id: &RoomId) -> Result<Vec<String>, HistoryError> {
        let logs = self.logs.lock().await;
        Ok(logs
            .get(room_id)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn limit(&self) -> usize {
        self.limit
    }
}
