//! メッセージバスの実装
//!
//! ## 実装
//!
//! - `inmemory`: `tokio::sync::broadcast` を使った実装（テスト・単一プロセス用）
//! - `redis`: Redis Pub/Sub を使った実装（複数プロセス用）

pub mod inmemory;
pub mod redis;

pub use self::inmemory::InMemoryMessageBus;
pub use self::redis::RedisMessageBus;
