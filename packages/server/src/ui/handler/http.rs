//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{RoomId, UserId, Username},
    infrastructure::dto::http::{CreateSessionRequest, RoomSummaryDto, SessionDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get rooms with local connections
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.manager.active_rooms().await;

    // Domain Model から DTO への変換
    let room_summaries = rooms
        .into_iter()
        .map(|room| RoomSummaryDto {
            id: room.room_id.into_string(),
            connections: room.connections,
            listening: room.listening,
        })
        .collect();

    Json(room_summaries)
}

/// Get a room's recent history, oldest first
pub async fn get_room_history(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<serde_json::Value>>, StatusCode> {
    let room_id = RoomId::try_from(room_id).map_err(|e| {
        tracing::warn!("Invalid room_id: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    let payloads = state.manager.history(&room_id).await.map_err(|e| {
        tracing::error!(room_id = %room_id, "Failed to load history: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    let messages = payloads
        .iter()
        .filter_map(|payload| match serde_json::from_str(payload) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(room_id = %room_id, "Skipping unreadable history entry: {}", e);
                None
            }
        })
        .collect();

    Ok(Json(messages))
}

/// Issue a user id for a new chat session
pub async fn create_session(
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionDto>), StatusCode> {
    let (room_id, username) = match (
        RoomId::try_from(request.room_id),
        Username::try_from(request.username),
    ) {
        (Ok(room_id), Ok(username)) => (room_id, username),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Invalid session request: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let session = SessionDto {
        user_id: UserId::generate().into_string(),
        username: username.into_string(),
        room_id: room_id.into_string(),
    };
    tracing::info!(user_id = %session.user_id, room_id = %session.room_id, "Session created");

    Ok((StatusCode::CREATED, Json(session)))
}
