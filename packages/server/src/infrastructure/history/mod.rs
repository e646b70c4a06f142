//! 履歴ストアの実装
//!
//! ## 実装
//!
//! - `inmemory`: プロセス内の HashMap を使った実装（テスト・単一プロセス用）
//! - `redis`: Redis のリストを使った実装（複数プロセス用）

pub mod inmemory;
pub mod redis;

pub use self::inmemory::InMemoryHistoryStore;
pub use self::redis::RedisHistoryStore;
