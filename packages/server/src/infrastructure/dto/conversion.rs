//! Conversion logic between DTOs and domain entities.

use std::collections::BTreeMap;

use crate::domain::{Member, Room, RoomRecord, RoomSettings, Song, TournamentStatus, Vote};
use crate::infrastructure::dto::{http as http_dto, websocket as dto};
use syncrate_shared::time::timestamp_to_rfc3339;

// ========================================
// DTO → Domain Entity
// ========================================

impl From<&http_dto::CreateRoomRequest> for RoomSettings {
    fn from(req: &http_dto::CreateRoomRequest) -> Self {
        Self {
            category_id: req.category_id,
            covers_only: req.covers_only,
            include_covers: req.include_covers,
            min_rating: req.min_rating,
            voted_only: req.voted_only,
            voted_ratio: req.voted_ratio,
            tree_size: req.tree_size,
            video_sync_enabled: req.video_sync_enabled.unwrap_or(true),
        }
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&Member> for dto::UserInfo {
    fn from(member: &Member) -> Self {
        Self {
            id: member.user_id.as_str().to_string(),
            username: member.display_name.as_str().to_string(),
        }
    }
}

impl From<&Vote> for dto::VoteUpdateData {
    fn from(vote: &Vote) -> Self {
        Self {
            user_id: vote.user_id.as_str().to_string(),
            username: vote.display_name.as_str().to_string(),
            rating: i64::from(vote.rating),
            comment: vote.comment.clone(),
        }
    }
}

impl From<&Room> for http_dto::RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            kind: room.kind.as_str().to_string(),
            creator: room.creator_name.as_str().to_string(),
            members: room
                .sorted_members()
                .into_iter()
                .map(|m| m.display_name.as_str().to_string())
                .collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
            last_activity_at: timestamp_to_rfc3339(room.last_activity_at.value()),
        }
    }
}

/// Member list frame payload, ordered by display name.
pub fn user_update(members: &[Member]) -> dto::UserUpdateData {
    dto::UserUpdateData {
        users: members.iter().map(dto::UserInfo::from).collect(),
    }
}

pub fn song_change(song: &Song, existing_votes: &[Vote]) -> dto::SongChangeData {
    dto::SongChangeData {
        song_id: song.id.value(),
        song_title_original: song.title.clone(),
        song_title_english: song.title_english.clone(),
        embed_url: crate::domain::youtube::embed_url(&song.source_url),
        thumbnail_url: song.thumbnail_url.clone(),
        source_url: song.source_url.clone(),
        artists: song.artists.clone(),
        category: song.category_name.clone().unwrap_or_default(),
        is_cover: song.is_cover,
        existing_votes: existing_votes.iter().map(dto::VoteUpdateData::from).collect(),
    }
}

/// Group votes by song id for the tournament state frame.
pub fn votes_by_song(votes: &[Vote]) -> BTreeMap<u32, Vec<dto::VoteUpdateData>> {
    let mut grouped: BTreeMap<u32, Vec<dto::VoteUpdateData>> = BTreeMap::new();
    for vote in votes {
        grouped
            .entry(vote.song_id.value())
            .or_default()
            .push(dto::VoteUpdateData::from(vote));
    }
    grouped
}

pub fn tournament_status_label(status: TournamentStatus) -> &'static str {
    match status {
        TournamentStatus::Setup => "setup",
        TournamentStatus::InProgress => "in_progress",
        TournamentStatus::Completed => "completed",
    }
}

/// Detail view of a persisted room, enriched with live members when the room is loaded.
pub fn room_detail(record: &RoomRecord, live: Option<&Room>) -> http_dto::RoomDetailDto {
    let members = live
        .map(|room| {
            room.sorted_members()
                .into_iter()
                .map(|m| http_dto::MemberDetailDto {
                    user_id: m.user_id.as_str().to_string(),
                    display_name: m.display_name.as_str().to_string(),
                    joined_at: timestamp_to_rfc3339(m.joined_at.value()),
                })
                .collect()
        })
        .unwrap_or_default();
    let is_tournament = record.kind == crate::domain::RoomKind::Tournament;

    http_dto::RoomDetailDto {
        id: record.room_id.as_str().to_string(),
        kind: record.kind.as_str().to_string(),
        creator: record.creator_name.as_str().to_string(),
        members,
        current_song_id: record.current_song_id.map(|id| id.value()),
        tournament_status: is_tournament
            .then(|| tournament_status_label(record.tournament_status).to_string()),
        current_match_id: record.current_match_id.map(|id| id.to_string()),
        video_sync_enabled: live.map_or(record.settings.video_sync_enabled, |room| {
            room.video_sync_enabled
        }),
        created_at: timestamp_to_rfc3339(record.created_at.value()),
        last_active_at: timestamp_to_rfc3339(record.last_active_at.value()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, RoomId, RoomKind, SongId, Timestamp, UserId};

    fn user(id: &str, name: &str) -> (UserId, DisplayName) {
        (
            UserId::new(id.to_string()).unwrap(),
            DisplayName::new(name.to_string()).unwrap(),
        )
    }

    #[test]
    fn test_vote_to_dto() {
        // テスト項目: 投票がワイヤ形式の VoteUpdateData に変換される
        // given (前提条件):
        let (u, n) = user("u1", "alice");
        let vote = Vote::new(u, n, SongId::new(3), 8, "good".to_string()).unwrap();

        // when (操作):
        let data = dto::VoteUpdateData::from(&vote);

        // then (期待する結果):
        assert_eq!(data.user_id, "u1");
        assert_eq!(data.username, "alice");
        assert_eq!(data.rating, 8);
        assert_eq!(data.comment, "good");
    }

    #[test]
    fn test_song_change_derives_embed_url() {
        // テスト項目: 曲変更ペイロードに埋め込み URL と既存投票が含まれる
        // given (前提条件):
        let song = Song {
            id: SongId::new(1),
            title: "Title".to_string(),
            title_english: "Title EN".to_string(),
            artists: vec!["A".to_string()],
            source_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            thumbnail_url: String::new(),
            category_id: Some(1),
            category_name: Some("Pop".to_string()),
            is_cover: false,
        };
        let (u, n) = user("u1", "alice");
        let votes = vec![Vote::new(u, n, SongId::new(1), 9, String::new()).unwrap()];

        // when (操作):
        let data = song_change(&song, &votes);

        // then (期待する結果):
        assert_eq!(data.embed_url, "https://www.youtube.com/embed/dQw4w9WgXcQ");
        assert_eq!(data.category, "Pop");
        assert_eq!(data.existing_votes.len(), 1);
    }

    #[test]
    fn test_votes_by_song_groups_votes() {
        // テスト項目: 投票が曲 ID ごとにまとめられる
        // given (前提条件):
        let (u1, n1) = user("u1", "alice");
        let (u2, n2) = user("u2", "bob");
        let votes = vec![
            Vote::new(u1.clone(), n1.clone(), SongId::new(1), 5, String::new()).unwrap(),
            Vote::new(u2, n2, SongId::new(1), 6, String::new()).unwrap(),
            Vote::new(u1, n1, SongId::new(2), 7, String::new()).unwrap(),
        ];

        // when (操作):
        let grouped = votes_by_song(&votes);

        // then (期待する結果):
        assert_eq!(grouped.get(&1).map(Vec::len), Some(2));
        assert_eq!(grouped.get(&2).map(Vec::len), Some(1));
    }

    #[test]
    fn test_room_detail_without_live_room() {
        // テスト項目: ライブルームがなくても永続レコードから詳細を作れる
        // given (前提条件):
        let (u, n) = user("u1", "alice");
        let record = RoomRecord::new(
            RoomId::new("AB12CD".to_string()).unwrap(),
            RoomKind::Tournament,
            u,
            n,
            RoomSettings::default(),
            Timestamp::new(0),
        );

        // when (操作):
        let detail = room_detail(&record, None);

        // then (期待する結果):
        assert_eq!(detail.id, "AB12CD");
        assert_eq!(detail.kind, "tournament");
        assert!(detail.members.is_empty());
        assert_eq!(detail.tournament_status.as_deref(), Some("setup"));
    }
}
