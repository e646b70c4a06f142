//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

/// Active room summary (`GET /api/rooms`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub id: String,
    /// Number of connections held by this process
    pub connections: usize,
    /// Whether this process currently runs a listener for the room
    pub listening: bool,
}

/// Session request (`POST /api/sessions`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateSessionRequest {
    pub username: String,
    pub room_id: String,
}

/// Session response with a freshly generated user id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDto {
    pub user_id: String,
    pub username: String,
    pub room_id: String,
}
