//! Domain layer
//!
//! チャットリレーのドメインモデルと、ドメイン層が必要とするポート（trait）を定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

pub mod connection;
pub mod entity;
pub mod error;
pub mod message_bus;
pub mod repository;
pub mod value_object;

pub use connection::ClientConnection;
pub use entity::{ChatMessage, MessageKind};
pub use error::{BusError, ConnectionError, HistoryError, ValueObjectError};
pub use message_bus::{BusSubscription, MessageBus};
pub use repository::{DEFAULT_HISTORY_LIMIT, HistoryStore};
pub use value_object::{ConnectionId, RoomId, UserId, Username};

#[cfg(test)]
pub use message_bus::MockMessageBus;
#[cfg(test)]
pub use repository::MockHistoryStore;
