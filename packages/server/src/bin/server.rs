//! Multi-process WebSocket chat relay.
//!
//! Clients join rooms over WebSocket; messages are fanned out to every server
//! process through a shared pub/sub bus, and recent history is replayed on join.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsudoi-server
//! cargo run --bin tsudoi-server -- --host 0.0.0.0 --port 3000 --redis-url redis://cache:6379
//! cargo run --bin tsudoi-server -- --backend memory
//! ```

use std::sync::Arc;

use clap::Parser;
use tsudoi_server::{
    config::{Backend, ServerConfig},
    domain::{HistoryStore, MessageBus},
    infrastructure::{
        history::{InMemoryHistoryStore, RedisHistoryStore},
        message_bus::{InMemoryMessageBus, RedisMessageBus},
    },
    ui::Server,
    usecase::{BroadcastManager, JoinRoomUseCase, LeaveRoomUseCase, SendMessageUseCase},
};
use tsudoi_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

/// Connect the bus and history store for the configured backend.
async fn connect_backend(
    config: &ServerConfig,
) -> Result<(Arc<dyn MessageBus>, Arc<dyn HistoryStore>), Box<dyn std::error::Error>> {
    match config.backend {
        Backend::Redis => {
            let client = redis::Client::open(config.redis_url.as_str())?;
            let conn = client.get_multiplexed_async_connection().await?;
            tracing::info!("Connected to Redis at {}", config.redis_url);
            let bus: Arc<dyn MessageBus> = Arc::new(RedisMessageBus::new(client, conn.clone()));
            let history: Arc<dyn HistoryStore> = Arc::new(RedisHistoryStore::new(conn, config.history_limit));
            Ok((bus, history))
        }
        Backend::Memory => {
            tracing::warn!("Using in-memory backend; messages are not shared between processes");
            let bus: Arc<dyn MessageBus> = Arc::new(InMemoryMessageBus::new());
            let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistoryStore::with_limit(config.history_limit));
            Ok((bus, history))
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    // Initialize dependencies in order:
    // 1. MessageBus / HistoryStore
    // 2. BroadcastManager
    // 3. UseCases
    // 4. Server

    // 1. Connect the backend before binding the listener socket
    let (bus, history) = connect_backend(&config).await?;

    // 2. Create BroadcastManager
    let manager = Arc::new(BroadcastManager::new(
        bus,
        history,
        config.broadcast_settings(),
    ));

    // 3. Create UseCases
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let join_room_usecase = Arc::new(JoinRoomUseCase::new(manager.clone(), clock.clone()));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(manager.clone(), clock.clone()));
    let leave_room_usecase = Arc::new(LeaveRoomUseCase::new(manager.clone(), clock));

    // 4. Create and run the server
    let server = Server::new(
        join_room_usecase,
        send_message_usecase,
        leave_room_usecase,
        manager,
    );
    server.run(config.host, config.port).await
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(&[env!("CARGO_BIN_NAME"), "tsudoi_shared"], "debug");

    let config = ServerConfig::parse();

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
