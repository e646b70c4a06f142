//! RoomLifecycleCoordinator
//!
//! 「アクティブなルームごとにリスナーはちょうど 1 つ」という不変条件と、
//! 入室時の購読完了待ち（上限付き）を担当します。
//!
//! ## ロック順序
//!
//! `listeners` → `ConnectionRegistry` の順でのみ取得する。
//! 停止判定はリスナー表のロック中にレジストリが空であることを確認してから行うため、
//! 最後の退室と新しい入室が競合しても、接続があるのにリスナーがない状態にはならない。
//!
//! ## 購読完了待ち
//!
//! リスナー表はルームごとに購読状態（`watch`）を保持する。購読処理中のリスナーを見つけた
//! 入室者は全員、同じ状態を同じ上限時間まで待ち、購読失敗も全員に同じエラーとして返る。

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::domain::{BusError, MessageBus, RoomId};

use super::{
    listener::{Readiness, RoomListener},
    registry::ConnectionRegistry,
};

/// 購読完了待ちの既定の上限
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(2);

/// `ensure_listener` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerStart {
    /// 新しいリスナーを起動し、購読完了を確認した
    Subscribed,
    /// 既にリスナーが起動していた（購読処理中だった場合は完了を待った）
    AlreadyRunning,
    /// 新しいリスナーを起動したが、上限時間内に購読完了を確認できなかった
    TimedOut,
    /// 購読完了前にリスナーが停止した
    Abandoned,
}

struct ListenerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    ready: watch::Receiver<Readiness>,
}

impl ListenerHandle {
    /// 購読済み、または購読処理中
    fn is_usable(&self) -> bool {
        !self.task.is_finished() && !matches!(*self.ready.borrow(), Readiness::Failed(_))
    }
}

/// ルームのリスナーのライフサイクル管理
pub struct RoomLifecycleCoordinator {
    bus: Arc<dyn MessageBus>,
    registry: Arc<ConnectionRegistry>,
    ready_timeout: Duration,
    listeners: Mutex<HashMap<RoomId, ListenerHandle>>,
    ready_timeouts: AtomicU64,
}

impl RoomLifecycleCoordinator {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        registry: Arc<ConnectionRegistry>,
        ready_timeout: Duration,
    ) -> Self {
        Self {
            bus,
            registry,
            ready_timeout,
            listeners: Mutex::new(HashMap::new()),
            ready_timeouts: AtomicU64::new(0),
        }
    }

    /// ルームのリスナーが起動していることを保証する（冪等）
    ///
    /// リスナーが購読処理中であれば、起動した呼び出し元もそれ以外の呼び出し元も、
    /// 購読完了を `ready_timeout` まで待つ。購読済みのリスナーに対しては待たずに返る。
    /// タイムアウトしても失敗にはしない（その間に発行されたメッセージを取りこぼす可能性がある）。
    ///
    /// # Errors
    ///
    /// リスナーが購読に失敗した場合はバスのエラーを返す（待機中の全員に同じエラー）
    pub async fn ensure_listener(&self, room_id: &RoomId) -> Result<ListenerStart, BusError> {
        let (mut ready, started) = {
            let mut listeners = self.listeners.lock().await;
            let running = listeners
                .get(room_id)
                .filter(|handle| handle.is_usable())
                .map(|handle| handle.ready.clone());
            match running {
                Some(ready) => (ready, false),
                None => {
                    if listeners.contains_key(room_id) {
                        tracing::warn!(room_id = %room_id, "Previous listener exited or failed, restarting");
                    }
                    let (ready_tx, ready_rx) = watch::channel(Readiness::Pending);
                    let cancel = CancellationToken::new();
                    let task =
                        RoomListener::new(room_id.clone(), self.bus.clone(), self.registry.clone())
                            .spawn(ready_tx, cancel.clone());
                    // 置き換えられた古いハンドルのタスクは終了済み、または終了処理中
                    listeners.insert(
                        room_id.clone(),
                        ListenerHandle {
                            cancel,
                            task,
                            ready: ready_rx.clone(),
                        },
                    );
                    tracing::info!(room_id = %room_id, "Started room listener");
                    (ready_rx, true)
                }
            }
        };

        let settled = tokio::time::timeout(self.ready_timeout, ready.wait_for(Readiness::is_settled))
            .await
            .map(|result| result.map(|state| (*state).clone()));

        match settled {
            Ok(Ok(Readiness::Ready)) if started => Ok(ListenerStart::Subscribed),
            Ok(Ok(Readiness::Ready)) => Ok(ListenerStart::AlreadyRunning),
            Ok(Ok(Readiness::Failed(e))) => Err(e),
            Ok(Ok(Readiness::Pending)) | Ok(Err(_)) => {
                tracing::debug!(room_id = %room_id, "Listener stopped before subscribing");
                Ok(ListenerStart::Abandoned)
            }
            Err(_) => {
                let total = self.ready_timeouts.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    room_id = %room_id,
                    timeout_ms = self.ready_timeout.as_millis() as u64,
                    ready_timeouts_total = total,
                    "Timed out waiting for room subscription; messages published meanwhile may be missed"
                );
                Ok(ListenerStart::TimedOut)
            }
        }
    }

    /// ルームに接続が残っていなければリスナーを停止する
    ///
    /// キャンセル後、リスナーが購読を解除して終了するまで待つ。
    ///
    /// # Returns
    ///
    /// リスナーを停止した場合は `true`
    pub async fn release_if_idle(&self, room_id: &RoomId) -> bool {
        let handle = {
            let mut listeners = self.listeners.lock().await;
            if self.registry.is_active(room_id).await {
                return false;
            }
            match listeners.remove(room_id) {
                Some(handle) => handle,
                None => return false,
            }
        };

        handle.cancel.cancel();
        if let Err(e) = handle.task.await {
            tracing::error!(room_id = %room_id, "Listener task failed: {}", e);
        }
        tracing::info!(room_id = %room_id, "Released room listener");
        true
    }

    /// ルームのリスナーが起動しているか
    pub async fn is_listening(&self, room_id: &RoomId) -> bool {
        self.listeners
            .lock()
            .await
            .get(room_id)
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// 起動中のリスナー数
    pub async fn listener_count(&self) -> usize {
        self.listeners.lock().await.len()
    }

    /// 購読完了待ちがタイムアウトした累計回数
    pub fn ready_timeouts(&self) -> u64 {
        self.ready_timeouts.load(Ordering::Relaxed)
    }

    /// 全リスナーを停止し、購読解除の完了を待つ
    pub async fn shutdown(&self) {
        let handles: Vec<(RoomId, ListenerHandle)> =
            self.listeners.lock().await.drain().collect();

        for (_, handle) in &handles {
            handle.cancel.cancel();
        }
        for (room_id, handle) in handles {
            if let Err(e) = handle.task.await {
                tracing::error!(room_id = %room_id, "Listener task failed during shutdown: {}", e);
            }
        }
        tracing::info!("All room listeners stopped");
    }
}
