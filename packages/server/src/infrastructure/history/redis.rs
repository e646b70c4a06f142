//! Redis History Store 実装
//!
//! `history:{room_id}` をキーとする Redis のリストに JSON を保存します。
//! `RPUSH` と `LTRIM` を `MULTI/EXEC` で 1 つのトランザクションとして送るため、
//! 複数プロセスが同時に追記しても上限件数が厳密に守られます。

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use crate::domain::{HistoryError, HistoryStore, RoomId};

/// Redis を使った History Store 実装
#[derive(Clone)]
pub struct RedisHistoryStore {
    conn: MultiplexedConnection,
    limit: usize,
}

impl RedisHistoryStore {
    pub fn new(conn: MultiplexedConnection, limit: usize) -> Self {
        Self { conn, limit }
    }
}

fn unavailable(e: redis::RedisError) -> HistoryError {
    HistoryError::Unavailable(e.to_string())
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn append(&self, room_id: &RoomId, payload: &str) -> Result<(), HistoryError> {
        let key = room_id.history_key();
        let start = -(self.limit as isize);
        let mut conn = self.conn.clone();

        let _: () = redis::pipe()
            .atomic()
            .rpush(&key, payload)
            .ignore()
            .ltrim(&key, start, -1)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        tracing::debug!(room_id = %room_id, "Appended message to history");
        Ok(())
    }

    async fn load(&self, room_id: &RoomId) -> Result<Vec<String>, HistoryError> {
        let mut conn = self.conn.clone();
        conn.lrange(room_id.history_key(), 0, -1)
            .await
            .map_err(unavailable)
    }

    fn limit(&self) -> usize {
        self.limit
    }
}
