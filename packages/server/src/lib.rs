//! Tsudoi chat relay server library.
//!
//! WebSocket クライアントをルーム単位でまとめ、共有 pub/sub バスを介して
//! 複数のサーバープロセス間でメッセージを中継します。

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
