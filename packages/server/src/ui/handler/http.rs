//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{BracketError, DisplayName, RoomId, RoomKind, RoomSettings, UserId},
    infrastructure::dto::{
        conversion,
        http::{CreateRoomRequest, CreateRoomResponse, ErrorResponse, RoomDetailDto, RoomSummaryDto},
    },
    ui::state::AppState,
    usecase::{CreateRoomCommand, CreateRoomError, SelectionError},
};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "rooms": state.room_manager.room_count().await,
        "connections": state.room_manager.connection_count().await,
    }))
}

/// Create a room
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<CreateRoomResponse>), ApiError> {
    // DTO から Domain Model への変換
    let kind: RoomKind = request
        .kind
        .parse()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let creator_id = UserId::new(request.user_id.clone())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let creator_name = DisplayName::new(request.display_name.clone())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let settings = RoomSettings::from(&request);

    let command = CreateRoomCommand {
        kind,
        creator_id,
        creator_name,
        settings,
    };
    match state.create_room_usecase.execute(command).await {
        Ok(record) => Ok((
            StatusCode::CREATED,
            Json(CreateRoomResponse {
                ws_path: format!("/ws?room_id={}", record.room_id),
                room_id: record.room_id.into_string(),
                kind: record.kind.as_str().to_string(),
            }),
        )),
        Err(e @ CreateRoomError::Bracket(BracketError::InvalidBracketSize(_)))
        | Err(e @ CreateRoomError::InvalidInput(_)) => {
            Err(api_error(StatusCode::BAD_REQUEST, e))
        }
        Err(e @ CreateRoomError::Selection(SelectionError::Bracket(_))) => {
            tracing::warn!("Cannot create {} room: {}", kind, e);
            Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e))
        }
        Err(e) => {
            tracing::error!("Failed to create {} room: {}", kind, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

/// Get list of live rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.room_manager.list_rooms().await;
    // Domain Model から DTO への変換
    Json(rooms.iter().map(RoomSummaryDto::from).collect())
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, ApiError> {
    let room_id =
        RoomId::new(room_id).map_err(|e| api_error(StatusCode::NOT_FOUND, e))?;
    let record = match state.store.load(&room_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                format!("room '{}' not found", room_id),
            ));
        }
        Err(e) => {
            tracing::error!("Failed to load room '{}': {}", room_id, e);
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e));
        }
    };
    let live = state.room_manager.get_room(&room_id).await;
    Ok(Json(conversion::room_detail(&record, live.as_ref())))
}
