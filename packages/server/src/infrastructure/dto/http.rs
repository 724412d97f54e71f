//! HTTP API request and response DTOs.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/rooms`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateRoomRequest {
    /// `rating`, `radio` or `tournament`
    pub kind: String,
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub category_id: Option<u32>,
    #[serde(default)]
    pub covers_only: bool,
    #[serde(default)]
    pub include_covers: bool,
    #[serde(default)]
    pub min_rating: Option<u8>,
    #[serde(default)]
    pub voted_only: bool,
    #[serde(default)]
    pub voted_ratio: Option<f64>,
    #[serde(default)]
    pub tree_size: Option<usize>,
    #[serde(default)]
    pub video_sync_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
    pub kind: String,
    /// Path to open the room's WebSocket, without identity parameters.
    pub ws_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub id: String,
    pub kind: String,
    pub creator: String,
    pub members: Vec<String>,
    pub created_at: String,
    pub last_activity_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDetailDto {
    pub user_id: String,
    pub display_name: String,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub id: String,
    pub kind: String,
    pub creator: String,
    pub members: Vec<MemberDetailDto>,
    pub current_song_id: Option<u32>,
    pub tournament_status: Option<String>,
    pub current_match_id: Option<String>,
    pub video_sync_enabled: bool,
    pub created_at: String,
    pub last_active_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
