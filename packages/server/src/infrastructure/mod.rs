//! Infrastructure layer
//!
//! ドメイン層が定義するポート（trait）の具体的な実装を提供します。

pub mod connection;
pub mod dto;
pub mod history;
pub mod message_bus;
