//! UseCase layer
//!
//! - `BroadcastManager` とその構成要素（レジストリ・ライフサイクル管理・リスナー）
//! - WebSocket セッションのユースケース（入室・送信・退室）

mod broadcast_manager;
mod error;
mod join_room;
mod leave_room;
mod lifecycle;
mod listener;
mod registry;
mod send_message;

pub use broadcast_manager::{BroadcastManager, BroadcastSettings, RoomStatus};
pub use error::BroadcastError;
pub use join_room::JoinRoomUseCase;
pub use leave_room::{LeaveReason, LeaveRoomUseCase};
pub use lifecycle::{DEFAULT_READY_TIMEOUT, ListenerStart, RoomLifecycleCoordinator};
pub use registry::{ConnectionRegistry, RemoveOutcome};
pub use send_message::SendMessageUseCase;
