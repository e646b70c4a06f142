//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{ClientConnection, RoomId, UserId, Username},
    infrastructure::{
        connection::{OutboundFrame, WebSocketConnection},
        dto::websocket::InboundFrame,
    },
    ui::state::AppState,
    usecase::LeaveReason,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub username: String,
}

/// Identity of one WebSocket session
struct Session {
    room_id: RoomId,
    user_id: UserId,
    username: Username,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path((room_id, user_id)): Path<(String, String)>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> Domain Models
    let session = match (
        RoomId::try_from(room_id.clone()),
        UserId::try_from(user_id.clone()),
        Username::try_from(query.username),
    ) {
        (Ok(room_id), Ok(user_id), Ok(username)) => Session {
            room_id,
            user_id,
            username,
        },
        (room_result, user_result, name_result) => {
            let reason = [
                room_result.err(),
                user_result.err(),
                name_result.err(),
            ]
            .into_iter()
            .flatten()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ");
            tracing::warn!(room_id = %room_id, user_id = %user_id, "Rejected connection: {}", reason);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, session)))
}

/// Spawns a task that drains outbound frames into the WebSocket sink.
///
/// The task ends when a `Close` frame is written, when every sender is gone,
/// or when the socket rejects a write.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        let _ = sender.close().await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, session: Session) {
    let (sender, mut receiver) = socket.split();

    // Outbound frames are queued until the pusher task drains them, so history
    // replayed during the join is written in order.
    let (connection, rx) = WebSocketConnection::channel();
    let connection_id = connection.id();
    let mut send_task = pusher_loop(rx, sender);

    let Session {
        room_id,
        user_id,
        username,
    } = session;

    if let Err(e) = state
        .join_room_usecase
        .execute(&room_id, &user_id, &username, Arc::new(connection))
        .await
    {
        tracing::error!(room_id = %room_id, user_id = %user_id, "Failed to join room: {}", e);
        // The only sender was owned by the rejected connection, so the pusher drains and exits.
        let _ = send_task.await;
        return;
    }

    let recv_state = state.clone();
    let recv_room_id = room_id.clone();
    let recv_user_id = user_id.clone();
    let recv_username = username.clone();

    // Spawn a task to receive messages from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!(room_id = %recv_room_id, user_id = %recv_user_id, "WebSocket read ended: {}", e);
                    return LeaveReason::Disconnected;
                }
            };

            match msg {
                Message::Text(text) => {
                    let frame = match InboundFrame::parse(text.as_str()) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!(room_id = %recv_room_id, user_id = %recv_user_id, "Malformed frame: {}", e);
                            return LeaveReason::Failed;
                        }
                    };

                    if let Err(e) = recv_state
                        .send_message_usecase
                        .execute(&recv_room_id, &recv_user_id, &recv_username, frame.message)
                        .await
                    {
                        tracing::error!(room_id = %recv_room_id, user_id = %recv_user_id, "Failed to send message: {}", e);
                        return LeaveReason::Failed;
                    }
                }
                Message::Ping(_) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                    tracing::trace!("Received ping");
                }
                Message::Close(_) => {
                    tracing::debug!(room_id = %recv_room_id, user_id = %recv_user_id, "Client requested close");
                    break;
                }
                _ => {}
            }
        }
        LeaveReason::Disconnected
    });

    // If any one of the tasks completes, abort the other
    let reason = tokio::select! {
        result = &mut recv_task => {
            send_task.abort();
            result.unwrap_or(LeaveReason::Failed)
        }
        _ = &mut send_task => {
            recv_task.abort();
            LeaveReason::Disconnected
        }
    };

    if let Err(e) = state
        .leave_room_usecase
        .execute(&room_id, &user_id, &username, connection_id, reason)
        .await
    {
        tracing::warn!(room_id = %room_id, user_id = %user_id, "Failed to broadcast leave notice: {}", e);
    }
}
