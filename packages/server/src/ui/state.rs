//! Server state shared by the handlers.

use std::sync::Arc;

use crate::usecase::{BroadcastManager, JoinRoomUseCase, LeaveRoomUseCase, SendMessageUseCase};

/// Shared application state
pub struct AppState {
    /// JoinRoomUseCase（入室のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// LeaveRoomUseCase（退室のユースケース）
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    /// BroadcastManager（ルーム一覧・履歴の参照用）
    pub manager: Arc<BroadcastManager>,
}
