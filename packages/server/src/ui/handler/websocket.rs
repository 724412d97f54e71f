//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
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
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

use crate::{
    domain::{DisplayName, OutboundFrame, PusherChannel, RoomId, UserId},
    ui::state::AppState,
    usecase::{DispatchError, JoinError},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub room_id: String,
    pub user_id: String,
    pub display_name: String,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert query -> Domain Models
    let (user_id, display_name, room_id) = match (
        UserId::new(query.user_id.clone()),
        DisplayName::new(query.display_name.clone()),
        RoomId::new(query.room_id.clone()),
    ) {
        (Ok(user_id), Ok(display_name), Ok(room_id)) => (user_id, display_name, room_id),
        _ => {
            tracing::warn!(
                "Rejected connection with invalid identity: user_id='{}' room_id='{}'",
                query.user_id,
                query.room_id
            );
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let (channel, rx) = PusherChannel::new();
    let connection_id = match state
        .join_room_usecase
        .execute(user_id.clone(), display_name, room_id.clone(), channel)
        .await
    {
        Ok(connection_id) => connection_id,
        Err(JoinError::RoomNotFound(_)) => {
            tracing::warn!("'{}' tried to join unknown room '{}'", user_id, room_id);
            return Err(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            tracing::error!("'{}' could not join room '{}': {}", user_id, room_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let failed_state = state.clone();
    let failed_user = user_id.clone();
    Ok(ws
        .on_failed_upgrade(move |e| {
            tracing::warn!("WebSocket upgrade for '{}' failed: {}", failed_user, e);
            tokio::spawn(async move {
                failed_state
                    .leave_room_usecase
                    .execute(&failed_user, Some(connection_id))
                    .await;
            });
        })
        .on_upgrade(move |socket| handle_socket(socket, state, user_id, connection_id, rx)))
}

/// Spawns a task that forwards queued frames to the WebSocket sink.
///
/// # Returns
///
/// A `JoinHandle` for the spawned task
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
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
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    user_id: UserId,
    connection_id: Uuid,
    rx: mpsc::UnboundedReceiver<OutboundFrame>,
) {
    let (sender, mut receiver) = socket.split();

    let reader_state = state.clone();
    let reader_user = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error from '{}': {}", reader_user, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let result = reader_state
                        .dispatch_usecase
                        .execute(&reader_user, connection_id, text.as_str())
                        .await;
                    match result {
                        Ok(_) => {}
                        // the writer flushes the error frame and closes the socket
                        Err(DispatchError::RoomGone(room_id)) => {
                            tracing::info!("Room '{}' of '{}' is gone", room_id, reader_user);
                        }
                        Err(e) => {
                            tracing::warn!("Dropped frame from '{}': {}", reader_user, e);
                        }
                    }
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("'{}' requested close", reader_user);
                    break;
                }
                _ => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    if let Some(room_id) = state
        .leave_room_usecase
        .execute(&user_id, Some(connection_id))
        .await
    {
        tracing::info!("'{}' disconnected from room '{}'", user_id, room_id);
    }
}
