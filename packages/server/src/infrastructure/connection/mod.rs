//! クライアント接続の実装
//!
//! - `websocket`: WebSocket への送信チャンネルを使った実装

pub mod websocket;

pub use websocket::{OutboundFrame, WebSocketConnection};
