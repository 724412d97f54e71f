//! WebSocket message DTOs.
//!
//! Every frame is a JSON text frame shaped as
//! `{"type": <kind>, "data": <payload>, "timestamp": <unix ms>}`.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{TournamentStatus, TreeState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Decode(String),

    #[error("unknown message kind '{0}'")]
    UnknownKind(String),

    #[error("failed to encode frame: {0}")]
    Encode(String),
}

/// Closed set of message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    JoinRoom,
    LeaveRoom,
    SongChange,
    VideoSync,
    VoteUpdate,
    #[serde(rename = "user_update")]
    UserListUpdate,
    NextSong,
    RoomSettings,
    TournamentState,
    StartTournament,
    StartMatch,
    PickWinner,
    NavigateMatch,
    Error,
}

impl MessageKind {
    pub const ALL: [MessageKind; 14] = [
        MessageKind::JoinRoom,
        MessageKind::LeaveRoom,
        MessageKind::SongChange,
        MessageKind::VideoSync,
        MessageKind::VoteUpdate,
        MessageKind::UserListUpdate,
        MessageKind::NextSong,
        MessageKind::RoomSettings,
        MessageKind::TournamentState,
        MessageKind::StartTournament,
        MessageKind::StartMatch,
        MessageKind::PickWinner,
        MessageKind::NavigateMatch,
        MessageKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::JoinRoom => "join_room",
            MessageKind::LeaveRoom => "leave_room",
            MessageKind::SongChange => "song_change",
            MessageKind::VideoSync => "video_sync",
            MessageKind::VoteUpdate => "vote_update",
            MessageKind::UserListUpdate => "user_update",
            MessageKind::NextSong => "next_song",
            MessageKind::RoomSettings => "room_settings",
            MessageKind::TournamentState => "tournament_state",
            MessageKind::StartTournament => "start_tournament",
            MessageKind::StartMatch => "start_match",
            MessageKind::PickWinner => "pick_winner",
            MessageKind::NavigateMatch => "navigate_match",
            MessageKind::Error => "error",
        }
    }

    /// Relayed to the room verbatim.
    pub fn is_pass_through(&self) -> bool {
        matches!(self, MessageKind::VideoSync | MessageKind::NavigateMatch)
    }

    /// Only the server sends these. A client sending one is ignored.
    pub fn is_server_originated(&self) -> bool {
        matches!(
            self,
            MessageKind::SongChange
                | MessageKind::UserListUpdate
                | MessageKind::TournamentState
                | MessageKind::Error
        )
    }
}

impl FromStr for MessageKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownKind(s.to_string()))
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded frame. The payload stays opaque until a handler asks for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub data: Value,
    pub timestamp: i64,
}

/// First decoding pass, so an unknown kind is told apart from malformed JSON.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    timestamp: i64,
}

impl Envelope {
    pub fn new(kind: MessageKind, data: Value, timestamp: i64) -> Self {
        Self {
            kind,
            data,
            timestamp,
        }
    }

    pub fn with_payload<T: Serialize>(
        kind: MessageKind,
        payload: &T,
        timestamp: i64,
    ) -> Result<Self, ProtocolError> {
        let data =
            serde_json::to_value(payload).map_err(|e| ProtocolError::Encode(e.to_string()))?;
        Ok(Self::new(kind, data, timestamp))
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawEnvelope =
            serde_json::from_str(text).map_err(|e| ProtocolError::Decode(e.to_string()))?;
        let kind = raw.kind.parse()?;
        Ok(Self::new(kind, raw.data, raw.timestamp))
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Decode the payload as `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.data.clone()).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomData {
    pub room_id: String,
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoSyncData {
    pub time: f64,
    pub is_playing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteUpdateData {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdateData {
    pub users: Vec<UserInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongChangeData {
    pub song_id: u32,
    pub song_title_original: String,
    #[serde(default)]
    pub song_title_english: String,
    #[serde(default)]
    pub embed_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_cover: bool,
    #[serde(default)]
    pub existing_votes: Vec<VoteUpdateData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettingsData {
    pub video_sync_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentStateData {
    pub tree_state: TreeState,
    pub status: TournamentStatus,
    pub current_match_id: Option<String>,
    pub video_sync_enabled: bool,
    /// Votes already cast on bracket songs, keyed by song id.
    #[serde(default)]
    pub existing_votes: BTreeMap<u32, Vec<VoteUpdateData>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartMatchData {
    pub match_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickWinnerData {
    pub match_id: String,
    pub song_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigateMatchData {
    pub match_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
    #[serde(default)]
    pub reload: bool,
}
