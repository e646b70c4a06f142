//! ConnectionRegistry
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - room → (user → connection) の登録・削除・スナップショット
//!
//! ### なぜこのテストが必要か
//! - 同一ユーザーの再接続で古い接続が閉じられることを保証
//! - 空になったルームのエントリが残らないことを保証（リスナー停止のトリガー）
//! - ファンアウト中の変更がスナップショットに影響しないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：追加・削除
//! - エッジケース：同一ユーザーの再接続、古い接続からの削除要求、最後の 1 人の削除

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::domain::{ClientConnection, ConnectionId, RoomId, UserId};

/// 接続削除の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// 削除した。`room_emptied` が true ならルームのエントリも削除された
    Removed { room_emptied: bool },
    /// 該当する接続がなかった（既に削除済み、または新しい接続に置き換え済み）
    NotFound,
}

type RoomConnections = HashMap<UserId, Arc<dyn ClientConnection>>;

/// プロセス内の接続レジストリ
///
/// 空の接続集合を持つルームのエントリは保持しない。
#[derive(Default)]
pub struct ConnectionRegistry {
    rooms: Mutex<HashMap<RoomId, RoomConnections>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続を登録する
    ///
    /// 同じ (room, user) の接続が既にあれば置き換え、古い接続を閉じる。
    /// 古い接続のクローズ失敗は無視する。
    ///
    /// # Returns
    ///
    /// 古い接続を置き換えた場合は `true`
    pub async fn add(
        &self,
        room_id: RoomId,
        user_id: UserId,
        connection: Arc<dyn ClientConnection>,
    ) -> bool {
        let superseded = {
            let mut rooms = self.rooms.lock().await;
            rooms
                .entry(room_id.clone())
                .or_default()
                .insert(user_id.clone(), connection)
        };

        match superseded {
            Some(previous) => {
                if let Err(e) = previous.close().await {
                    tracing::debug!(
                        room_id = %room_id,
                        user_id = %user_id,
                        "Superseded connection was already closed: {}",
                        e
                    );
                }
                tracing::info!(room_id = %room_id, user_id = %user_id, "Superseded previous connection");
                true
            }
            None => false,
        }
    }

    /// (room, user) の接続を無条件に削除する
    pub async fn remove(&self, room_id: &RoomId, user_id: &UserId) -> RemoveOutcome {
        self.remove_where(room_id, user_id, |_| true).await
    }

    /// (room, user) の接続が `connection_id` のものである場合だけ削除する
    ///
    /// 置き換えられた古い接続が後から削除を要求しても、新しい接続は残る。
    pub async fn remove_connection(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> RemoveOutcome {
        self.remove_where(room_id, user_id, |connection| {
            connection.id() == connection_id
        })
        .await
    }

    async fn remove_where<F>(&self, room_id: &RoomId, user_id: &UserId, matches: F) -> RemoveOutcome
    where
        F: FnOnce(&Arc<dyn ClientConnection>) -> bool,
    {
        let mut rooms = self.rooms.lock().await;
        let Some(connections) = rooms.get_mut(room_id) else {
            return RemoveOutcome::NotFound;
        };
        if !connections.get(user_id).is_some_and(matches) {
            return RemoveOutcome::NotFound;
        }

        connections.remove(user_id);
        let room_emptied = connections.is_empty();
        if room_emptied {
            rooms.remove(room_id);
        }
        RemoveOutcome::Removed { room_emptied }
    }

    /// ルームの接続集合のコピーを取得する
    ///
    /// 返り値はレジストリから独立しており、反復中の登録・削除は反映されない。
    pub async fn snapshot(&self, room_id: &RoomId) -> Vec<Arc<dyn ClientConnection>> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id)
            .map(|connections| connections.values().cloned().collect())
            .unwrap_or_default()
    }

    /// ルームに接続が 1 つ以上あるか
    pub async fn is_active(&self, room_id: &RoomId) -> bool {
        self.rooms.lock().await.contains_key(room_id)
    }

    /// (room, user) の接続が登録されているか
    pub async fn contains(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.rooms
            .lock()
            .await
            .get(room_id)
            .is_some_and(|connections| connections.contains_key(user_id))
    }

    /// アクティブなルームと接続数（ルーム ID 順）
    pub async fn rooms(&self) -> Vec<(RoomId, usize)> {
        let rooms = self.rooms.lock().await;
        let mut summary: Vec<(RoomId, usize)> = rooms
            .iter()
            .map(|(room_id, connections)| (room_id.clone(), connections.len()))
            .collect();
        summary.sort_by(|a, b| a.0.cmp(&b.0));
        summary
    }
}
