//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::usecase::{BroadcastManager, JoinRoomUseCase, LeaveRoomUseCase, SendMessageUseCase};

use super::{
    handler::{create_session, get_room_history, get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket chat relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     join_room_usecase,
///     send_message_usecase,
///     leave_room_usecase,
///     manager,
/// );
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `join_room_usecase` - UseCase for joining a room
    /// * `send_message_usecase` - UseCase for message sending
    /// * `leave_room_usecase` - UseCase for leaving a room
    /// * `manager` - The broadcast manager the usecases share
    pub fn new(
        join_room_usecase: Arc<JoinRoomUseCase>,
        send_message_usecase: Arc<SendMessageUseCase>,
        leave_room_usecase: Arc<LeaveRoomUseCase>,
        manager: Arc<BroadcastManager>,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                join_room_usecase,
                send_message_usecase,
                leave_room_usecase,
                manager,
            }),
        }
    }

    /// Build the axum router with every endpoint
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws/{room_id}/{user_id}", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{room_id}/history", get(get_room_history))
            .route("/api/sessions", post(create_session))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the WebSocket chat relay server
    ///
    /// After the HTTP server stops, every room listener is cancelled and its
    /// subscription released before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();

        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!(
            "Chat relay server listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws/{{room_id}}/{{user_id}}?username=...", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        self.state.manager.shutdown().await;
        served?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
