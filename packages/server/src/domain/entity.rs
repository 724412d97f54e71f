//! Domain entities: live rooms, persisted room records and catalog data.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{
    error::ValueObjectError,
    value_object::{DisplayName, MatchId, RoomId, SongId, Timestamp, UserId},
};

/// The three collaborative session types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Rating,
    Radio,
    Tournament,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Rating => "rating",
            RoomKind::Radio => "radio",
            RoomKind::Tournament => "tournament",
        }
    }
}

impl FromStr for RoomKind {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rating" => Ok(RoomKind::Rating),
            "radio" => Ok(RoomKind::Radio),
            "tournament" => Ok(RoomKind::Tournament),
            other => Err(ValueObjectError::UnknownRoomKind(other.to_string())),
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connected user as seen from inside a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub joined_at: Timestamp,
}

/// Shared video position for rooms that synchronize playback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackState {
    pub position: f64,
    pub is_playing: bool,
}

/// Live, in-memory view of a room.
///
/// Owned by the room manager. Members are keyed by user id, so a user can
/// appear at most once.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    pub creator_id: UserId,
    pub creator_name: DisplayName,
    pub members: HashMap<UserId, Member>,
    pub created_at: Timestamp,
    pub last_activity_at: Timestamp,
    /// Current song or match, depending on the room kind.
    pub current_item_id: Option<String>,
    pub playback: PlaybackState,
    pub video_sync_enabled: bool,
}

impl Room {
    pub fn new(
        id: RoomId,
        kind: RoomKind,
        creator_id: UserId,
        creator_name: DisplayName,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            kind,
            creator_id,
            creator_name,
            members: HashMap::new(),
            created_at: now,
            last_activity_at: now,
            current_item_id: None,
            playback: PlaybackState::default(),
            video_sync_enabled: true,
        }
    }

    /// Insert or replace a member and mark the room active.
    pub fn add_member(&mut self, member: Member, now: Timestamp) {
        self.members.insert(member.user_id.clone(), member);
        self.touch(now);
    }

    /// Remove a member and mark the room active. Returns the removed member, if any.
    pub fn remove_member(&mut self, user_id: &UserId, now: Timestamp) -> Option<Member> {
        let removed = self.members.remove(user_id);
        if removed.is_some() {
            self.touch(now);
        }
        removed
    }

    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.contains_key(user_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Members ordered by display name, then user id, for stable user lists.
    pub fn sorted_members(&self) -> Vec<&Member> {
        let mut members: Vec<&Member> = self.members.values().collect();
        members.sort_by(|a, b| {
            a.display_name
                .as_str()
                .cmp(b.display_name.as_str())
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        members
    }

    pub fn touch(&mut self, now: Timestamp) {
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    /// A room is idle when it is empty and has seen no activity for longer than `threshold_millis`.
    pub fn is_idle(&self, now: Timestamp, threshold_millis: i64) -> bool {
        self.members.is_empty() && self.last_activity_at.elapsed_until(now) > threshold_millis
    }
}

/// A song as exposed by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    #[serde(default)]
    pub title_english: String,
    #[serde(default)]
    pub artists: Vec<String>,
    pub source_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub category_id: Option<u32>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub is_cover: bool,
}

impl Song {
    /// Artist names joined for display.
    pub fn artist_label(&self) -> String {
        if self.artists.is_empty() {
            "Unknown Artist".to_string()
        } else {
            self.artists.join(", ")
        }
    }
}

/// One user's rating of one song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub song_id: SongId,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl Vote {
    pub const MIN_RATING: i64 = 1;
    pub const MAX_RATING: i64 = 10;

    pub fn new(
        user_id: UserId,
        display_name: DisplayName,
        song_id: SongId,
        rating: i64,
        comment: String,
    ) -> Result<Self, ValueObjectError> {
        if !(Self::MIN_RATING..=Self::MAX_RATING).contains(&rating) {
            return Err(ValueObjectError::InvalidRating(rating));
        }
        Ok(Self {
            user_id,
            display_name,
            song_id,
            rating: rating as u8,
            comment,
        })
    }
}

/// How cover songs are treated by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoverPolicy {
    #[default]
    Any,
    Only,
    Exclude,
}

/// Candidate filter understood by the song catalog.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SongFilter {
    pub category_id: Option<u32>,
    pub covers: CoverPolicy,
    pub min_average_rating: Option<f64>,
    pub exclude: Vec<SongId>,
}

impl SongFilter {
    pub fn excluding(mut self, ids: impl IntoIterator<Item = SongId>) -> Self {
        self.exclude.extend(ids);
        self
    }
}

/// Lifecycle of a tournament as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    #[default]
    Setup,
    InProgress,
    Completed,
}

/// Filters and switches chosen when a room is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSettings {
    #[serde(default)]
    pub category_id: Option<u32>,
    /// Rating and tournament rooms: only covers.
    #[serde(default)]
    pub covers_only: bool,
    /// Radio rooms: covers are excluded unless this is set.
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
    #[serde(default = "default_video_sync")]
    pub video_sync_enabled: bool,
}

fn default_video_sync() -> bool {
    true
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            category_id: None,
            covers_only: false,
            include_covers: false,
            min_rating: None,
            voted_only: false,
            voted_ratio: None,
            tree_size: None,
            video_sync_enabled: true,
        }
    }
}

impl RoomSettings {
    /// Build the catalog filter these settings imply for a room kind.
    pub fn song_filter(&self, kind: RoomKind) -> SongFilter {
        let covers = match kind {
            RoomKind::Radio if !self.include_covers => CoverPolicy::Exclude,
            RoomKind::Radio => CoverPolicy::Any,
            _ if self.covers_only => CoverPolicy::Only,
            _ => CoverPolicy::Any,
        };
        SongFilter {
            category_id: self.category_id,
            covers,
            min_average_rating: match kind {
                RoomKind::Radio => self.min_rating.map(f64::from),
                _ => None,
            },
            ..SongFilter::default()
        }
    }
}

/// Persisted view of a room, owned by the external record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub room_id: RoomId,
    pub kind: RoomKind,
    pub creator_id: UserId,
    pub creator_name: DisplayName,
    pub settings: RoomSettings,
    pub current_song_id: Option<SongId>,
    pub tournament_status: TournamentStatus,
    pub current_match_id: Option<MatchId>,
    /// Serialized bracket. Opaque to the store.
    pub tree_blob: Option<String>,
    pub created_at: Timestamp,
    pub last_active_at: Timestamp,
}

impl RoomRecord {
    pub fn new(
        room_id: RoomId,
        kind: RoomKind,
        creator_id: UserId,
        creator_name: DisplayName,
        settings: RoomSettings,
        now: Timestamp,
    ) -> Self {
        Self {
            room_id,
            kind,
            creator_id,
            creator_name,
            settings,
            current_song_id: None,
            tournament_status: TournamentStatus::Setup,
            current_match_id: None,
            tree_blob: None,
            created_at: now,
            last_active_at: now,
        }
    }
}
